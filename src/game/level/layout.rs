use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::anchor::{AnchorRegistry, HookAnchor};
use crate::game::collision::{Capsule, Collider, ColliderShape};
use crate::game::components::*;
use crate::game::events::{LevelTeardown, LoadLevel};
use crate::game::hook::indicator::HookIndicator;
use crate::game::hook::machine::HookState;
use crate::game::hook::systems::{HookArmPresentation, TravelOverlaps};
use crate::game::hook::target::HookAim;
use crate::game::intent::Intent;
use crate::game::view::ChaseCamera;
use crate::net::replication::{HookReplica, LastSentReplica};
use crate::net::role::LocalPlayers;

pub const OWNER_NET_ID: NetId = NetId(1);
pub const PRIORITY_NET_ID: NetId = NetId(2);
const ANCHOR_NET_ID_BASE: u32 = 100;
const DAMAGEABLE_NET_ID_BASE: u32 = 1000;

/// Character collision capsule shared by both playable characters.
pub const CHARACTER_CAPSULE: Capsule = Capsule {
    radius: 42.0,
    half_height: 96.0,
};

const ANCHOR_RADIUS: f32 = 25.0;

/// Target priority policy of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelLayout {
    /// Arena: the priority target beats anchors while in front of the owner.
    Confined,
    /// Anchors beat the priority target whenever one is usable.
    Open,
}

impl LevelLayout {
    pub fn from_level_name(name: &str) -> Self {
        if name.contains("Arena") { Self::Confined } else { Self::Open }
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleShape {
    Sphere { radius: f32 },
    Box { half_extents: [f32; 3] },
}

impl From<ObstacleShape> for ColliderShape {
    fn from(shape: ObstacleShape) -> Self {
        match shape {
            ObstacleShape::Sphere { radius } => ColliderShape::Sphere { radius },
            ObstacleShape::Box { half_extents } => ColliderShape::Cuboid {
                half_extents: Vec3::from_array(half_extents),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    pub position: [f32; 3],
    pub shape: ObstacleShape,
}

/// A non-player actor that hook travel can damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageablePlacement {
    pub position: [f32; 3],
    pub radius: f32,
    pub health: f32,
}

/// A level definition, stored as ron under `levels/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub name: String,
    /// Overrides the layout implied by the level name.
    #[serde(default)]
    pub layout: Option<LevelLayout>,
    #[serde(default)]
    pub floor_height: f32,
    pub owner_spawn: [f32; 3],
    #[serde(default = "default_facing")]
    pub owner_facing: [f32; 3],
    #[serde(default)]
    pub priority_spawn: Option<[f32; 3]>,
    #[serde(default)]
    pub anchors: Vec<[f32; 3]>,
    #[serde(default)]
    pub obstacles: Vec<ObstaclePlacement>,
    #[serde(default)]
    pub damageables: Vec<DamageablePlacement>,
}

fn default_facing() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}

impl LevelSpec {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| LevelError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn layout(&self) -> LevelLayout {
        self.layout
            .unwrap_or_else(|| LevelLayout::from_level_name(&self.name))
    }

    /// Owner transform at spawn, facing along `owner_facing` projected onto the floor plane.
    pub fn owner_transform(&self) -> Transform {
        let facing = Vec3::from_array(self.owner_facing).with_y(0.0);
        let facing = facing.try_normalize().unwrap_or(Vec3::X);
        Transform::from_translation(Vec3::from_array(self.owner_spawn)).looking_to(facing, Vec3::Y)
    }
}

/// The level currently simulated on this instance.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct CurrentLevel {
    pub name: String,
    pub layout: LevelLayout,
    pub floor_height: f32,
}

/// Seconds since the current level started.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct LevelClock {
    pub elapsed: f32,
}

/// Spawn every entity of `spec`, tagged `InLevel`. Entities whose id is in
/// `local` are marked `LocallyControlled`.
pub fn spawn_level(commands: &mut Commands, spec: &LevelSpec, local: &LocalPlayers) {
    let owner_transform = spec.owner_transform();
    let chase = ChaseCamera::default();
    let mut owner = commands.spawn((
        (HookOwner, PlayerCharacter, OWNER_NET_ID, InLevel),
        owner_transform,
        (
            Velocity::default(),
            Movement::default(),
            InputGate::default(),
            Intent::default(),
        ),
        (Health::new(100.0), CanBeDamaged::default()),
        CHARACTER_CAPSULE,
        (
            HookState::default(),
            HookCooldown::default(),
            HookAim::default(),
            HookIndicator::default(),
            TravelOverlaps::default(),
            HookArmPresentation::default(),
        ),
        (HookReplica::default(), LastSentReplica::default()),
        (chase, chase.view_from(&owner_transform)),
    ));
    if local.controls(OWNER_NET_ID) {
        owner.insert(LocallyControlled);
    }

    if let Some(position) = spec.priority_spawn {
        let mut priority = commands.spawn((
            (PriorityTarget, PlayerCharacter, PRIORITY_NET_ID, InLevel),
            Transform::from_translation(Vec3::from_array(position)),
            (Velocity::default(), Movement::default(), Intent::default()),
            (Health::new(100.0), CanBeDamaged::default()),
            CHARACTER_CAPSULE,
        ));
        if local.controls(PRIORITY_NET_ID) {
            priority.insert(LocallyControlled);
        }
    }

    for (i, position) in spec.anchors.iter().enumerate() {
        commands.spawn((
            HookAnchor,
            NetId(ANCHOR_NET_ID_BASE + i as u32),
            InLevel,
            Transform::from_translation(Vec3::from_array(*position)),
            Collider::blocking(ColliderShape::Sphere {
                radius: ANCHOR_RADIUS,
            }),
        ));
    }

    for obstacle in &spec.obstacles {
        commands.spawn((
            InLevel,
            Transform::from_translation(Vec3::from_array(obstacle.position)),
            Collider::blocking(obstacle.shape.into()),
        ));
    }

    for (i, actor) in spec.damageables.iter().enumerate() {
        commands.spawn((
            NetId(DAMAGEABLE_NET_ID_BASE + i as u32),
            InLevel,
            Transform::from_translation(Vec3::from_array(actor.position)),
            Collider::overlap_only(ColliderShape::Sphere {
                radius: actor.radius,
            }),
            Health::new(actor.health),
            CanBeDamaged::default(),
        ));
    }
}

fn despawn_level_entities(commands: &mut Commands, level_entities: &Query<Entity, With<InLevel>>) {
    for entity in level_entities {
        commands.entity(entity).despawn();
    }
}

/// Tear down the active level: drop anchors first so outstanding handles
/// die before their entities do.
pub fn teardown_level(
    mut commands: Commands,
    mut events: MessageReader<LevelTeardown>,
    mut registry: ResMut<AnchorRegistry>,
    level_entities: Query<Entity, With<InLevel>>,
) {
    if events.read().count() == 0 {
        return;
    }
    registry.clear();
    despawn_level_entities(&mut commands, &level_entities);
    commands.remove_resource::<CurrentLevel>();
    info!("Level torn down");
}

/// Replace the active level with the last requested one.
pub fn load_level(
    mut commands: Commands,
    mut events: MessageReader<LoadLevel>,
    mut registry: ResMut<AnchorRegistry>,
    mut clock: ResMut<LevelClock>,
    local: Res<LocalPlayers>,
    level_entities: Query<Entity, With<InLevel>>,
) {
    let Some(LoadLevel(spec)) = events.read().last() else {
        return;
    };
    registry.clear();
    despawn_level_entities(&mut commands, &level_entities);
    spawn_level(&mut commands, spec, &local);

    let layout = spec.layout();
    commands.insert_resource(CurrentLevel {
        name: spec.name.clone(),
        layout,
        floor_height: spec.floor_height,
    });
    clock.elapsed = 0.0;
    info!(
        "Level '{}' loaded: {:?}, {} anchors, {} obstacles",
        spec.name,
        layout,
        spec.anchors.len(),
        spec.obstacles.len()
    );
}

pub fn tick_level_clock(time: Res<Time>, level: Option<Res<CurrentLevel>>, mut clock: ResMut<LevelClock>) {
    if level.is_some() {
        clock.elapsed += time.delta_secs();
    }
}
