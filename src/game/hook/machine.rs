use bevy::prelude::*;

use super::phase::{HookError, HookPhase, PhaseEvent, transition};
use super::target::{HookScene, HookTarget, is_in_front, resolve_target};
use crate::config::tuning::HookTuning;
use crate::net::protocol::HookRequest;

/// Component-wise tolerance for "the arm is at its destination".
const ARRIVAL_TOLERANCE: f32 = 1e-4;

/// Why a hook shot ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Retracted,
    ReachedTarget,
    /// Travel path obstructed or target gone.
    Blocked,
    FailSafe,
    Cancelled,
}

impl ExitReason {
    pub fn starts_cooldown(self) -> bool {
        self != Self::Blocked
    }
}

/// Per-owner hook shot state. Runs on the instance that controls the owner;
/// every physical consequence leaves as a `HookRequest`.
#[derive(Component, Debug, Clone, Default)]
pub struct HookState {
    phase: HookPhase,
    target: HookTarget,
    target_location: Vec3,
    arm_location: Vec3,
    fail_safe_elapsed: f32,
    input_suppressed: bool,
    last_exit: Option<ExitReason>,
}

impl HookState {
    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    pub fn target(&self) -> HookTarget {
        self.target
    }

    pub fn target_location(&self) -> Vec3 {
        self.target_location
    }

    pub fn arm_location(&self) -> Vec3 {
        self.arm_location
    }

    pub fn fail_safe_elapsed(&self) -> f32 {
        self.fail_safe_elapsed
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn is_traveling(&self) -> bool {
        self.phase == HookPhase::TravelingToTarget
    }

    /// Owner input is disabled while a shot with a valid target runs.
    pub fn input_suppressed(&self) -> bool {
        self.input_suppressed
    }

    pub fn last_exit(&self) -> Option<ExitReason> {
        self.last_exit
    }

    fn advance(&mut self, event: PhaseEvent) -> Result<(), HookError> {
        let next = transition(self.phase, event)?;
        debug!("hook phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Start a shot at whatever the selector picks right now.
    pub fn fire(
        &mut self,
        scene: &HookScene,
        tuning: &HookTuning,
        on_cooldown: bool,
        out: &mut Vec<HookRequest>,
    ) -> Result<(), HookError> {
        if self.is_active() {
            return Err(HookError::AlreadyActive);
        }
        if on_cooldown {
            return Err(HookError::OnCooldown);
        }
        self.advance(PhaseEvent::Fire)?;

        let owner = scene.owner;
        let (target, location) = if scene.priority.is_none() {
            error!("hook fired with no priority target in the level");
            (HookTarget::None, owner.position)
        } else {
            let resolution = resolve_target(scene, tuning);
            let aimed = match resolution.target {
                HookTarget::Priority(_) => scene
                    .target_location(resolution.target)
                    .map(|p| p + Vec3::Y * tuning.priority_target_height_offset),
                other => scene.target_location(other),
            };
            match aimed {
                Some(location) if is_in_front(&owner, location, tuning.priority_facing_tolerance) => {
                    (resolution.target, location)
                }
                _ => (HookTarget::None, miss_location(scene, tuning)),
            }
        };

        self.target = target;
        self.target_location = location;
        self.arm_location = owner.position;
        self.fail_safe_elapsed = 0.0;
        self.input_suppressed = target.is_some();
        self.last_exit = None;

        out.push(HookRequest::SetTarget {
            location: location.to_array(),
        });
        out.push(HookRequest::Start {
            valid_target: target.is_some(),
        });
        Ok(())
    }

    /// Advance one simulation step. Returns the exit reason if the shot ended.
    pub fn tick(
        &mut self,
        scene: &HookScene,
        tuning: &HookTuning,
        dt: f32,
        out: &mut Vec<HookRequest>,
    ) -> Option<ExitReason> {
        if !self.is_active() {
            return None;
        }

        self.fail_safe_elapsed += dt;
        if self.fail_safe_elapsed >= tuning.fail_safe_length {
            return self.exit(ExitReason::FailSafe, scene.owner.velocity, tuning, out);
        }

        let owner = scene.owner;
        match self.phase {
            HookPhase::ShootingOutward => {
                self.arm_location =
                    interp_constant(self.arm_location, self.target_location, dt, tuning.outward_speed);
                out.push(HookRequest::ArmLocation {
                    location: self.arm_location.to_array(),
                });
                if self
                    .arm_location
                    .abs_diff_eq(self.target_location, ARRIVAL_TOLERANCE)
                {
                    if self.target.is_some() {
                        self.advance(PhaseEvent::ArmHit).ok()?;
                        out.push(HookRequest::StartTravel);
                    } else {
                        self.advance(PhaseEvent::ArmMissed).ok()?;
                    }
                }
                None
            }
            HookPhase::TravelingToTarget => {
                let Some(live) = scene.target_location(self.target) else {
                    return self.exit(ExitReason::Blocked, owner.velocity, tuning, out);
                };
                self.target_location = live;
                if scene.sweep_to(&[self.target], live).is_some() {
                    return self.exit(ExitReason::Blocked, owner.velocity, tuning, out);
                }
                if owner.position.distance(live) < tuning.reached_target_tolerance {
                    if self.target.is_priority() {
                        out.push(HookRequest::Collision);
                    }
                    return self.exit(ExitReason::ReachedTarget, owner.velocity, tuning, out);
                }
                let direction = (live - owner.position).normalize_or_zero();
                out.push(HookRequest::TravelVelocity {
                    direction: direction.to_array(),
                });
                self.arm_location = live;
                out.push(HookRequest::ArmLocation {
                    location: live.to_array(),
                });
                None
            }
            HookPhase::Retracting => {
                let next = interp_constant(self.arm_location, owner.position, dt, tuning.retract_speed);
                if next.distance_squared(owner.position) < tuning.retract_done_dist_sq {
                    return self.exit(ExitReason::Retracted, owner.velocity, tuning, out);
                }
                self.arm_location = next;
                out.push(HookRequest::ArmLocation {
                    location: next.to_array(),
                });
                None
            }
            HookPhase::Idle => None,
        }
    }

    /// External early termination. Only a shot aimed at the priority target
    /// can be cancelled, whatever its phase.
    pub fn cancel(
        &mut self,
        owner_velocity: Vec3,
        tuning: &HookTuning,
        out: &mut Vec<HookRequest>,
    ) -> Option<ExitReason> {
        if !self.is_active() || !self.target.is_priority() {
            return None;
        }
        self.exit(ExitReason::Cancelled, owner_velocity, tuning, out)
    }

    fn exit(
        &mut self,
        reason: ExitReason,
        owner_velocity: Vec3,
        tuning: &HookTuning,
        out: &mut Vec<HookRequest>,
    ) -> Option<ExitReason> {
        let velocity = if self.is_traveling() {
            if self.target.is_priority() {
                Vec3::ZERO
            } else {
                owner_velocity / tuning.exit_velocity_damping
            }
        } else {
            owner_velocity
        };
        if let Err(e) = self.advance(PhaseEvent::Exit) {
            warn!("hook exit refused: {e}");
            return None;
        }
        out.push(HookRequest::End {
            velocity: velocity.to_array(),
        });
        self.input_suppressed = false;
        self.target = HookTarget::None;
        self.last_exit = Some(reason);
        Some(reason)
    }
}

/// Move `current` toward `target` by at most `speed * dt`, landing exactly on `target`.
pub fn interp_constant(current: Vec3, target: Vec3, dt: f32, speed: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    let step = speed * dt;
    if speed <= 0.0 || step >= distance {
        return target;
    }
    current + delta / distance * step
}

/// Where a shot with nothing to grab ends: the first blocking hit along the
/// owner's forward vector, or the end of the trace.
pub fn miss_location(scene: &HookScene, tuning: &HookTuning) -> Vec3 {
    let from = scene.owner.position;
    let to = from + scene.owner.forward * tuning.max_shot_distance_on_block;
    scene
        .obstacles
        .line_trace(from, to, &[scene.owner.entity])
        .map_or(to, |hit| hit.location)
}

/// Arm location as presented: shifted sideways toward the travel side and
/// vertically by travel direction.
pub fn arm_render_location(
    arm_location: Vec3,
    target_location: Vec3,
    owner_position: Vec3,
    tuning: &HookTuning,
) -> Vec3 {
    let lateral = if target_location.x > owner_position.x {
        tuning.arm_offset_right
    } else {
        tuning.arm_offset_left
    };
    let vertical = if target_location.y < owner_position.y {
        tuning.arm_offset_vertical
    } else {
        -tuning.arm_offset_vertical
    };
    arm_location + Vec3::new(lateral, vertical, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::hook::target::tests::Fixture;
    use crate::game::level::layout::LevelLayout;

    const DT: f32 = 1.0 / 60.0;

    /// Runs the machine against a fixture, applying requests the way the
    /// authority would and integrating the owner without gravity.
    struct Sim {
        f: Fixture,
        state: HookState,
        tuning: HookTuning,
        requests: Vec<HookRequest>,
        elapsed: f32,
    }

    impl Sim {
        fn new(f: Fixture) -> Self {
            Self {
                f,
                state: HookState::default(),
                tuning: HookTuning::default(),
                requests: Vec::new(),
                elapsed: 0.0,
            }
        }

        fn fire(&mut self) -> Result<(), HookError> {
            let mut out = Vec::new();
            let result = self.state.fire(&self.f.scene(), &self.tuning, false, &mut out);
            self.apply(&out);
            result
        }

        fn step(&mut self) -> Option<ExitReason> {
            let mut out = Vec::new();
            let exit = self.state.tick(&self.f.scene(), &self.tuning, DT, &mut out);
            self.apply(&out);
            self.f.owner_position += self.f.owner_velocity * DT;
            self.elapsed += DT;
            exit
        }

        fn cancel(&mut self) -> Option<ExitReason> {
            let mut out = Vec::new();
            let exit = self.state.cancel(self.f.owner_velocity, &self.tuning, &mut out);
            self.apply(&out);
            exit
        }

        fn run_to_exit(&mut self, max_ticks: usize) -> Option<ExitReason> {
            (0..max_ticks).find_map(|_| self.step())
        }

        fn apply(&mut self, out: &[HookRequest]) {
            for request in out {
                match *request {
                    HookRequest::Start { valid_target: true } | HookRequest::Collision => {
                        self.f.owner_velocity = Vec3::ZERO;
                    }
                    HookRequest::TravelVelocity { direction } => {
                        self.f.owner_velocity = Vec3::from_array(direction) * self.tuning.travel_speed;
                    }
                    HookRequest::End { velocity } => self.f.owner_velocity = Vec3::from_array(velocity),
                    _ => {}
                }
            }
            self.requests.extend_from_slice(out);
        }

        fn last_end_velocity(&self) -> Option<Vec3> {
            self.requests.iter().rev().find_map(|r| match r {
                HookRequest::End { velocity } => Some(Vec3::from_array(*velocity)),
                _ => None,
            })
        }
    }

    fn arena_with_priority_at(position: Vec3) -> Sim {
        let mut f = Fixture::new(LevelLayout::Confined);
        f.priority_position = Some(position);
        Sim::new(f)
    }

    /// Open level, priority target behind the owner, one anchor ahead.
    fn open_with_anchor_at(position: Vec3) -> Sim {
        let mut f = Fixture::new(LevelLayout::Open);
        f.priority_position = Some(Vec3::new(-500.0, 0.0, 0.0));
        f.anchor(position);
        Sim::new(f)
    }

    #[test]
    fn arm_reaches_priority_target_after_distance_over_speed() {
        let mut sim = arena_with_priority_at(Vec3::new(100.0, 0.0, 0.0));
        sim.tuning.priority_target_height_offset = 0.0;
        sim.fire().unwrap();
        assert!(matches!(sim.state.target(), HookTarget::Priority(_)));
        assert!(sim.state.input_suppressed());

        let target = Vec3::new(100.0, 0.0, 0.0);
        let speed = sim.tuning.outward_speed;
        while sim.state.phase() == HookPhase::ShootingOutward {
            assert!(sim.step().is_none());
            if sim.state.arm_location() != target {
                assert!(sim.elapsed < 100.0 / speed);
            }
        }
        assert_eq!(sim.state.arm_location(), target);
        assert!(sim.elapsed + 1e-6 >= 100.0 / speed);
        assert_eq!(sim.state.phase(), HookPhase::TravelingToTarget);
        assert!(sim.requests.contains(&HookRequest::StartTravel));
    }

    #[test]
    fn arm_approaches_monotonically_without_overshoot() {
        let mut sim = arena_with_priority_at(Vec3::new(300.0, 0.0, 120.0));
        sim.fire().unwrap();
        let target = sim.state.target_location();
        assert_eq!(target, Vec3::new(300.0, sim.tuning.priority_target_height_offset, 120.0));

        let mut previous = sim.state.arm_location();
        while sim.state.phase() == HookPhase::ShootingOutward {
            sim.step();
            let arm = sim.state.arm_location();
            let to_target_before = target - previous;
            let to_target_now = target - arm;
            assert!(to_target_now.length() <= to_target_before.length());
            assert!(to_target_now.dot(to_target_before) >= 0.0);
            assert!(to_target_before.cross(arm - previous).length() < 1e-2);
            previous = arm;
        }
    }

    #[test]
    fn blocked_sole_target_misses_and_retracts() {
        let mut sim = arena_with_priority_at(Vec3::new(400.0, 0.0, 0.0));
        sim.f.wall(Vec3::new(200.0, 0.0, 0.0), 30.0);
        sim.fire().unwrap();

        assert_eq!(sim.state.target(), HookTarget::None);
        assert!(!sim.state.input_suppressed());
        assert!(sim.requests.contains(&HookRequest::Start { valid_target: false }));
        // Line trace along forward stops at the wall surface.
        assert!(sim.state.target_location().abs_diff_eq(Vec3::new(170.0, 0.0, 0.0), 1e-3));

        while sim.state.phase() == HookPhase::ShootingOutward {
            sim.step();
        }
        assert_eq!(sim.state.phase(), HookPhase::Retracting);
        assert!(!sim.requests.contains(&HookRequest::StartTravel));

        assert_eq!(sim.run_to_exit(60), Some(ExitReason::Retracted));
        assert_eq!(sim.state.phase(), HookPhase::Idle);
    }

    #[test]
    fn miss_with_nothing_ahead_uses_full_shot_distance() {
        let mut sim = arena_with_priority_at(Vec3::new(-400.0, 0.0, 0.0));
        sim.fire().unwrap();
        let expected = Vec3::X * sim.tuning.max_shot_distance_on_block;
        assert!(sim.state.target_location().abs_diff_eq(expected, 1e-3));
    }

    #[test]
    fn fail_safe_mid_travel_to_anchor_keeps_damped_velocity() {
        let mut sim = open_with_anchor_at(Vec3::new(6000.0, 0.0, 0.0));
        sim.fire().unwrap();
        assert!(matches!(sim.state.target(), HookTarget::Anchor(_)));

        let exit = sim.run_to_exit(400);
        assert_eq!(exit, Some(ExitReason::FailSafe));
        assert!(sim.elapsed >= sim.tuning.fail_safe_length - DT);
        let velocity = sim.last_end_velocity().unwrap();
        let expected = Vec3::X * sim.tuning.travel_speed / sim.tuning.exit_velocity_damping;
        assert!(velocity.abs_diff_eq(expected, 1e-2), "{velocity}");
        assert!(ExitReason::FailSafe.starts_cooldown());
    }

    #[test]
    fn round_trip_to_priority_finishes_within_fail_safe() {
        let mut sim = arena_with_priority_at(Vec3::new(400.0, 0.0, 0.0));
        sim.fire().unwrap();

        let max_ticks = (sim.tuning.fail_safe_length / DT) as usize + 1;
        assert_eq!(sim.run_to_exit(max_ticks), Some(ExitReason::ReachedTarget));
        assert!(sim.elapsed < sim.tuning.fail_safe_length);
        assert!(sim.requests.contains(&HookRequest::Collision));
        assert_eq!(sim.last_end_velocity(), Some(Vec3::ZERO));
        assert!(!sim.state.input_suppressed());
    }

    #[test]
    fn reaching_an_anchor_keeps_partial_momentum() {
        let mut sim = open_with_anchor_at(Vec3::new(900.0, 0.0, 0.0));
        sim.fire().unwrap();
        assert_eq!(sim.run_to_exit(400), Some(ExitReason::ReachedTarget));
        assert!(!sim.requests.contains(&HookRequest::Collision));
        let velocity = sim.last_end_velocity().unwrap();
        assert!((velocity.x - sim.tuning.travel_speed / sim.tuning.exit_velocity_damping).abs() < 1e-2);
    }

    #[test]
    fn travel_pins_arm_to_target() {
        let mut sim = open_with_anchor_at(Vec3::new(900.0, 0.0, 0.0));
        sim.fire().unwrap();
        while sim.state.phase() != HookPhase::TravelingToTarget {
            sim.step();
        }
        sim.step();
        assert_eq!(sim.state.arm_location(), Vec3::new(900.0, 0.0, 0.0));
        assert!(sim.requests.iter().any(|r| matches!(r, HookRequest::TravelVelocity { .. })));
    }

    #[test]
    fn destroyed_target_mid_travel_exits_without_cooldown() {
        let mut sim = arena_with_priority_at(Vec3::new(900.0, 0.0, 0.0));
        sim.fire().unwrap();
        while sim.state.phase() != HookPhase::TravelingToTarget {
            sim.step();
        }
        sim.f.priority_position = None;
        assert_eq!(sim.step(), Some(ExitReason::Blocked));
        assert!(!ExitReason::Blocked.starts_cooldown());
    }

    #[test]
    fn obstruction_during_travel_aborts() {
        let mut sim = open_with_anchor_at(Vec3::new(900.0, 0.0, 0.0));
        sim.fire().unwrap();
        while sim.state.phase() != HookPhase::TravelingToTarget {
            sim.step();
        }
        sim.step();
        sim.f.wall(Vec3::new(600.0, 0.0, 0.0), 40.0);
        assert_eq!(sim.step(), Some(ExitReason::Blocked));
        let velocity = sim.last_end_velocity().unwrap();
        assert!(velocity.abs_diff_eq(Vec3::new(1000.0, 0.0, 0.0), 1e-2));
    }

    #[test]
    fn cancel_ignored_while_traveling_to_anchor() {
        let mut sim = open_with_anchor_at(Vec3::new(1500.0, 0.0, 0.0));
        sim.fire().unwrap();
        while sim.state.phase() != HookPhase::TravelingToTarget {
            sim.step();
        }
        assert_eq!(sim.cancel(), None);
        assert!(sim.state.is_traveling());
    }

    #[test]
    fn cancel_honoured_while_traveling_to_priority() {
        let mut sim = arena_with_priority_at(Vec3::new(900.0, 0.0, 0.0));
        sim.fire().unwrap();
        while sim.state.phase() != HookPhase::TravelingToTarget {
            sim.step();
        }
        sim.step();
        assert_eq!(sim.cancel(), Some(ExitReason::Cancelled));
        assert_eq!(sim.last_end_velocity(), Some(Vec3::ZERO));
        assert_eq!(sim.state.phase(), HookPhase::Idle);
    }

    #[test]
    fn cancel_refused_for_anchor_shot_while_shooting_outward() {
        let mut sim = open_with_anchor_at(Vec3::new(1500.0, 0.0, 0.0));
        sim.fire().unwrap();
        sim.step();
        assert_eq!(sim.state.phase(), HookPhase::ShootingOutward);
        assert_eq!(sim.cancel(), None);
        assert_eq!(sim.state.phase(), HookPhase::ShootingOutward);
        assert!(!sim.requests.iter().any(|r| matches!(r, HookRequest::End { .. })));
    }

    #[test]
    fn cancel_refused_for_missed_shot_while_retracting() {
        let mut sim = arena_with_priority_at(Vec3::new(-400.0, 0.0, 0.0));
        sim.fire().unwrap();
        while sim.state.phase() == HookPhase::ShootingOutward {
            sim.step();
        }
        assert_eq!(sim.state.phase(), HookPhase::Retracting);
        assert_eq!(sim.cancel(), None);
        assert_eq!(sim.state.phase(), HookPhase::Retracting);
    }

    #[test]
    fn cancel_honoured_while_shooting_at_priority() {
        let mut sim = arena_with_priority_at(Vec3::new(900.0, 0.0, 0.0));
        sim.fire().unwrap();
        sim.step();
        assert_eq!(sim.state.phase(), HookPhase::ShootingOutward);
        assert_eq!(sim.cancel(), Some(ExitReason::Cancelled));
        assert_eq!(sim.cancel(), None);
    }

    #[test]
    fn missing_priority_target_is_a_harmless_no_target_shot() {
        let mut sim = Sim::new(Fixture::new(LevelLayout::Open));
        sim.f.anchor(Vec3::new(300.0, 0.0, 0.0));
        // Selector and firing agree: no reticle, no target.
        assert_eq!(resolve_target(&sim.f.scene(), &sim.tuning).target, HookTarget::None);
        sim.fire().unwrap();
        assert_eq!(sim.state.target(), HookTarget::None);
        assert_eq!(sim.state.target_location(), Vec3::ZERO);

        sim.step();
        assert_eq!(sim.state.phase(), HookPhase::Retracting);
        assert_eq!(sim.step(), Some(ExitReason::Retracted));
    }

    #[test]
    fn fire_refused_while_active_or_cooling_down() {
        let mut sim = arena_with_priority_at(Vec3::new(400.0, 0.0, 0.0));
        sim.fire().unwrap();
        assert_eq!(sim.fire(), Err(HookError::AlreadyActive));

        let mut idle = HookState::default();
        let mut out = Vec::new();
        assert_eq!(
            idle.fire(&sim.f.scene(), &sim.tuning, true, &mut out),
            Err(HookError::OnCooldown)
        );
        assert!(out.is_empty());
        assert_eq!(idle.phase(), HookPhase::Idle);
    }

    #[test]
    fn render_offsets_follow_travel_side() {
        let tuning = HookTuning::default();
        let arm = Vec3::new(10.0, 10.0, 0.0);
        let right_and_up = arm_render_location(arm, Vec3::new(100.0, 50.0, 0.0), Vec3::ZERO, &tuning);
        assert_eq!(right_and_up, arm + Vec3::new(tuning.arm_offset_right, -tuning.arm_offset_vertical, 0.0));
        let left_and_down = arm_render_location(arm, Vec3::new(-100.0, -50.0, 0.0), Vec3::ZERO, &tuning);
        assert_eq!(left_and_down, arm + Vec3::new(tuning.arm_offset_left, tuning.arm_offset_vertical, 0.0));
    }

    #[test]
    fn interp_constant_lands_exactly() {
        let target = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(interp_constant(Vec3::ZERO, target, 1.0, 2.0), Vec3::new(1.2, 1.6, 0.0));
        assert_eq!(interp_constant(Vec3::ZERO, target, 1.0, 10.0), target);
    }
}
