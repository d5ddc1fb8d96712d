use bevy::prelude::*;

use crate::config::tuning::HookTuning;
use crate::game::collision::{Capsule, ObstacleSet, SweepHit};
use crate::game::level::anchor::{AnchorHandle, AnchorRegistry};
use crate::game::level::layout::LevelLayout;
use crate::game::view::ViewProjection;

/// What a hook shot is aimed at. Both references are weak: anchors through
/// generation-checked handles, the priority target through its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookTarget {
    #[default]
    None,
    Anchor(AnchorHandle),
    Priority(Entity),
}

impl HookTarget {
    pub fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn is_priority(&self) -> bool {
        matches!(self, Self::Priority(_))
    }

    pub fn anchor(&self) -> Option<AnchorHandle> {
        match self {
            Self::Anchor(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// Output of one selector query.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetResolution {
    pub target: HookTarget,
    /// First blocking contact of the last sweep performed, if any.
    pub blocking_hit: Option<SweepHit>,
}

/// Latest selector result for a locally controlled owner.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct HookAim(pub TargetResolution);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnerPose {
    pub entity: Entity,
    pub position: Vec3,
    /// Unit forward vector.
    pub forward: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityPose {
    pub entity: Entity,
    pub position: Vec3,
}

/// Everything the selector and the state machine read in one tick.
#[derive(Debug, Clone, Copy)]
pub struct HookScene<'a> {
    pub owner: OwnerPose,
    /// Owner capsule already scaled for obstruction sweeps.
    pub sweep_shape: Capsule,
    pub priority: Option<PriorityPose>,
    pub anchors: &'a AnchorRegistry,
    pub obstacles: &'a ObstacleSet,
    pub view: &'a ViewProjection,
    pub layout: LevelLayout,
    /// Owner is currently travelling to a hook target.
    pub traveling: bool,
}

impl HookScene<'_> {
    /// Live world location of `target`, or `None` once it is gone.
    pub fn target_location(&self, target: HookTarget) -> Option<Vec3> {
        match target {
            HookTarget::None => None,
            HookTarget::Anchor(handle) => self.anchors.resolve(handle),
            HookTarget::Priority(entity) => self
                .priority
                .filter(|p| p.entity == entity)
                .map(|p| p.position),
        }
    }

    /// Entities an obstruction sweep passes through: the owner, the priority
    /// target and every anchor among `targets`.
    pub fn sweep_ignores(&self, targets: &[HookTarget]) -> Vec<Entity> {
        let mut ignore = vec![self.owner.entity];
        if let Some(priority) = self.priority {
            ignore.push(priority.entity);
        }
        ignore.extend(targets.iter().filter_map(|t| t.anchor()).map(|handle| handle.entity));
        ignore
    }

    pub fn sweep_to(&self, targets: &[HookTarget], location: Vec3) -> Option<SweepHit> {
        self.obstacles.sweep(
            self.owner.position,
            location,
            self.sweep_shape,
            &self.sweep_ignores(targets),
        )
    }
}

/// `point` lies in front of the owner: the cosine between forward and the
/// direction to `point` exceeds `tolerance`.
pub fn is_in_front(owner: &OwnerPose, point: Vec3, tolerance: f32) -> bool {
    let to_point = (point - owner.position).normalize_or_zero();
    owner.forward.dot(to_point) > tolerance
}

fn anchor_usable(scene: &HookScene, position: Vec3, tuning: &HookTuning) -> bool {
    is_in_front(&scene.owner, position, tuning.anchor_facing_tolerance) && scene.view.is_on_screen(position)
}

fn closest_usable_anchor(scene: &HookScene, tuning: &HookTuning) -> Option<(AnchorHandle, Vec3)> {
    let handle = scene
        .anchors
        .closest_usable(scene.owner.position, |p| anchor_usable(scene, p, tuning))?;
    scene.anchors.resolve(handle).map(|p| (handle, p))
}

/// Pick the single best hook target for the owner. Nothing is selectable
/// while the level has no priority target.
///
/// Arenas favour the priority target whenever it is in front; open levels
/// favour the nearest usable anchor. The tentative choice must survive an
/// obstruction sweep, with one fallback: an arena may fall back from a
/// blocked priority target to an anchor, an open level from a blocked
/// anchor to the priority target.
pub fn resolve_target(scene: &HookScene, tuning: &HookTuning) -> TargetResolution {
    if scene.priority.is_none() {
        return TargetResolution::default();
    }
    let priority_in_front = scene
        .priority
        .is_some_and(|p| is_in_front(&scene.owner, p.position, tuning.priority_facing_tolerance));
    let confined = scene.layout == LevelLayout::Confined;

    let mut tentative = None;
    if !scene.traveling && (!confined || !priority_in_front) {
        tentative = closest_usable_anchor(scene, tuning)
            .map(|(handle, position)| (HookTarget::Anchor(handle), position));
    }
    if tentative.is_none() && priority_in_front {
        tentative = scene
            .priority
            .map(|p| (HookTarget::Priority(p.entity), p.position));
    }
    let Some((target, location)) = tentative else {
        return TargetResolution::default();
    };

    let Some(hit) = scene.sweep_to(&[target], location) else {
        return TargetResolution {
            target,
            blocking_hit: None,
        };
    };

    let fallback = match (target, scene.layout) {
        (HookTarget::Priority(_), LevelLayout::Confined) => closest_usable_anchor(scene, tuning)
            .map(|(handle, position)| (HookTarget::Anchor(handle), position)),
        (HookTarget::Anchor(_), LevelLayout::Open) => scene
            .priority
            .map(|p| (HookTarget::Priority(p.entity), p.position)),
        _ => None,
    };
    let Some((fallback, location)) = fallback else {
        return TargetResolution {
            target: HookTarget::None,
            blocking_hit: Some(hit),
        };
    };

    // The blocked tentative anchor stays ignored on the fallback path.
    match scene.sweep_to(&[target, fallback], location) {
        None => TargetResolution {
            target: fallback,
            blocking_hit: None,
        },
        Some(hit) => TargetResolution {
            target: HookTarget::None,
            blocking_hit: Some(hit),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::collision::ColliderShape;

    /// Fixture: owner at the origin facing +X with a camera behind it.
    pub(crate) struct Fixture {
        pub world: World,
        pub owner: Entity,
        pub priority: Entity,
        pub anchors: AnchorRegistry,
        pub obstacles: ObstacleSet,
        pub view: ViewProjection,
        pub layout: LevelLayout,
        pub priority_position: Option<Vec3>,
        pub owner_position: Vec3,
        pub owner_velocity: Vec3,
        pub traveling: bool,
    }

    impl Fixture {
        pub fn new(layout: LevelLayout) -> Self {
            let mut world = World::new();
            let owner = world.spawn_empty().id();
            let priority = world.spawn_empty().id();
            Self {
                world,
                owner,
                priority,
                anchors: AnchorRegistry::default(),
                obstacles: ObstacleSet::default(),
                view: ViewProjection::looking_at(
                    Vec3::new(-900.0, 150.0, 0.0),
                    Vec3::new(200.0, 0.0, 0.0),
                    70f32.to_radians(),
                    Vec2::new(1920.0, 1080.0),
                ),
                layout,
                priority_position: None,
                owner_position: Vec3::ZERO,
                owner_velocity: Vec3::ZERO,
                traveling: false,
            }
        }

        pub fn anchor(&mut self, position: Vec3) -> AnchorHandle {
            let entity = self.world.spawn_empty().id();
            self.anchors.register(entity, position)
        }

        /// Anchor that also blocks sweeps, as spawned levels have them.
        pub fn solid_anchor(&mut self, position: Vec3, radius: f32) -> AnchorHandle {
            let handle = self.anchor(position);
            self.obstacles
                .push(handle.entity, position, ColliderShape::Sphere { radius });
            handle
        }

        pub fn wall(&mut self, center: Vec3, radius: f32) -> Entity {
            let entity = self.world.spawn_empty().id();
            self.obstacles
                .push(entity, center, ColliderShape::Sphere { radius });
            entity
        }

        pub fn scene(&self) -> HookScene<'_> {
            HookScene {
                owner: OwnerPose {
                    entity: self.owner,
                    position: self.owner_position,
                    forward: Vec3::X,
                    velocity: self.owner_velocity,
                },
                sweep_shape: Capsule {
                    radius: 21.0,
                    half_height: 48.0,
                },
                priority: self.priority_position.map(|position| PriorityPose {
                    entity: self.priority,
                    position,
                }),
                anchors: &self.anchors,
                obstacles: &self.obstacles,
                view: &self.view,
                layout: self.layout,
                traveling: self.traveling,
            }
        }
    }

    fn tuning() -> HookTuning {
        HookTuning::default()
    }

    #[test]
    fn arena_prefers_priority_target_over_closer_anchor() {
        let mut f = Fixture::new(LevelLayout::Confined);
        f.priority_position = Some(Vec3::new(100.0, 0.0, 0.0));
        f.anchor(Vec3::new(50.0, 0.0, 0.0));

        let result = resolve_target(&f.scene(), &tuning());
        assert_eq!(result.target, HookTarget::Priority(f.priority));
        assert!(result.blocking_hit.is_none());
    }

    #[test]
    fn open_level_prefers_nearest_usable_anchor() {
        let mut f = Fixture::new(LevelLayout::Open);
        f.priority_position = Some(Vec3::new(100.0, 0.0, 0.0));
        let _far = f.anchor(Vec3::new(80.0, 0.0, 0.0));
        let near = f.anchor(Vec3::new(50.0, 0.0, 0.0));

        let result = resolve_target(&f.scene(), &tuning());
        assert_eq!(result.target, HookTarget::Anchor(near));
    }

    #[test]
    fn anchors_behind_or_off_screen_are_not_usable() {
        let mut f = Fixture::new(LevelLayout::Open);
        f.anchor(Vec3::new(-200.0, 0.0, 0.0));
        f.anchor(Vec3::new(100.0, 0.0, 4000.0));
        assert_eq!(resolve_target(&f.scene(), &tuning()).target, HookTarget::None);

        // Slightly behind the owner's lateral plane still counts as in front.
        let beside = f.anchor(Vec3::new(-5.0, 0.0, 120.0));
        assert_eq!(resolve_target(&f.scene(), &tuning()).target, HookTarget::Anchor(beside));
    }

    #[test]
    fn arena_falls_back_to_anchor_when_priority_blocked() {
        let mut f = Fixture::new(LevelLayout::Confined);
        f.priority_position = Some(Vec3::new(400.0, 0.0, 0.0));
        f.wall(Vec3::new(200.0, 0.0, 0.0), 30.0);
        let anchor = f.anchor(Vec3::new(300.0, 0.0, 300.0));

        let result = resolve_target(&f.scene(), &tuning());
        assert_eq!(result.target, HookTarget::Anchor(anchor));
        assert!(result.blocking_hit.is_none());
    }

    #[test]
    fn open_level_falls_back_to_priority_when_anchor_blocked() {
        let mut f = Fixture::new(LevelLayout::Open);
        f.priority_position = Some(Vec3::new(300.0, 0.0, -300.0));
        f.anchor(Vec3::new(400.0, 0.0, 0.0));
        f.wall(Vec3::new(200.0, 0.0, 0.0), 30.0);

        let result = resolve_target(&f.scene(), &tuning());
        assert_eq!(result.target, HookTarget::Priority(f.priority));
    }

    #[test]
    fn blocked_sole_target_reports_hit_and_no_target() {
        let mut f = Fixture::new(LevelLayout::Confined);
        f.priority_position = Some(Vec3::new(400.0, 0.0, 0.0));
        let wall = f.wall(Vec3::new(200.0, 0.0, 0.0), 30.0);

        let result = resolve_target(&f.scene(), &tuning());
        assert_eq!(result.target, HookTarget::None);
        let hit = result.blocking_hit.expect("wall blocks the sweep");
        assert_eq!(hit.entity, wall);
        assert!(hit.location.x < 200.0);
    }

    #[test]
    fn blocked_fallback_reports_no_target() {
        let mut f = Fixture::new(LevelLayout::Open);
        f.priority_position = Some(Vec3::new(400.0, 0.0, 0.0));
        f.anchor(Vec3::new(500.0, 0.0, 0.0));
        f.wall(Vec3::new(200.0, 0.0, 0.0), 30.0);

        let result = resolve_target(&f.scene(), &tuning());
        assert_eq!(result.target, HookTarget::None);
        assert!(result.blocking_hit.is_some());
    }

    #[test]
    fn arena_anchor_choice_blocked_has_no_fallback() {
        // Priority target behind: the arena picks an anchor, which has no fallback.
        let mut f = Fixture::new(LevelLayout::Confined);
        f.priority_position = Some(Vec3::new(-400.0, 0.0, 0.0));
        f.anchor(Vec3::new(400.0, 0.0, 0.0));
        f.wall(Vec3::new(200.0, 0.0, 0.0), 30.0);

        assert_eq!(resolve_target(&f.scene(), &tuning()).target, HookTarget::None);
    }

    #[test]
    fn traveling_skips_anchor_preference() {
        let mut f = Fixture::new(LevelLayout::Open);
        f.priority_position = Some(Vec3::new(600.0, 0.0, 0.0));
        f.anchor(Vec3::new(100.0, 0.0, 0.0));
        f.traveling = true;

        assert_eq!(
            resolve_target(&f.scene(), &tuning()).target,
            HookTarget::Priority(f.priority)
        );
    }

    #[test]
    fn open_fallback_sweep_ignores_blocked_anchor() {
        let mut f = Fixture::new(LevelLayout::Open);
        f.priority_position = Some(Vec3::new(800.0, 0.0, 0.0));
        // Sits beside the priority path, close enough to block a sweep that
        // does not ignore it.
        f.solid_anchor(Vec3::new(400.0, 0.0, 40.0), 25.0);
        f.wall(Vec3::new(200.0, 0.0, 45.0), 10.0);

        let result = resolve_target(&f.scene(), &tuning());
        assert_eq!(result.target, HookTarget::Priority(f.priority));
        assert!(result.blocking_hit.is_none());
    }

    #[test]
    fn missing_priority_target_selects_nothing() {
        let mut f = Fixture::new(LevelLayout::Open);
        f.anchor(Vec3::new(150.0, 0.0, 0.0));
        assert_eq!(resolve_target(&f.scene(), &tuning()), TargetResolution::default());

        f.priority_position = Some(Vec3::new(-400.0, 0.0, 0.0));
        assert!(matches!(
            resolve_target(&f.scene(), &tuning()).target,
            HookTarget::Anchor(_)
        ));
    }

    #[test]
    fn repeated_queries_agree() {
        let mut f = Fixture::new(LevelLayout::Open);
        f.priority_position = Some(Vec3::new(300.0, 0.0, 20.0));
        f.anchor(Vec3::new(250.0, 50.0, 0.0));
        f.anchor(Vec3::new(260.0, 0.0, -40.0));
        f.wall(Vec3::new(120.0, 0.0, 10.0), 15.0);

        let scene = f.scene();
        let first = resolve_target(&scene, &tuning());
        for _ in 0..5 {
            assert_eq!(resolve_target(&scene, &tuning()), first);
        }
    }

    #[test]
    fn stale_anchor_handle_has_no_location() {
        let mut f = Fixture::new(LevelLayout::Open);
        let handle = f.anchor(Vec3::new(100.0, 0.0, 0.0));
        assert!(f.scene().target_location(HookTarget::Anchor(handle)).is_some());
        f.anchors.clear();
        assert!(f.scene().target_location(HookTarget::Anchor(handle)).is_none());
    }
}
