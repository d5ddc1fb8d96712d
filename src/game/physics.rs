use bevy::prelude::*;

use super::components::*;
use super::intent::Intent;
use super::level::layout::CurrentLevel;
use crate::config::tuning::Tuning;

const GROUND_EPSILON: f32 = 0.5;

fn grounded(translation: Vec3, floor: Option<f32>) -> bool {
    floor.is_some_and(|floor| translation.y <= floor + GROUND_EPSILON)
}

/// PhysicsSet: steer walking bodies toward their move intent. Airborne
/// bodies without input keep their momentum.
pub fn apply_move_intent(
    tuning: Res<Tuning>,
    level: Option<Res<CurrentLevel>>,
    mut bodies: Query<(&Transform, &Intent, Option<&InputGate>, &Movement, &mut Velocity), With<PlayerCharacter>>,
) {
    let floor = level.as_ref().map(|level| level.floor_height);
    let step = tuning.input_accel * tuning.dt;
    for (transform, intent, gate, movement, mut velocity) in &mut bodies {
        if movement.mode != MovementMode::Walking {
            continue;
        }
        let intent = intent.gated(gate.is_none_or(|gate| gate.open));
        if intent.move_dir == Vec3::ZERO && !grounded(transform.translation, floor) {
            continue;
        }
        let desired = intent.move_dir.with_y(0.0).clamp_length_max(1.0) * tuning.max_walk_speed;
        let horizontal = velocity.0.with_y(0.0);
        let delta = desired - horizontal;
        let next = if delta.length() <= step {
            desired
        } else {
            horizontal + delta.normalize() * step
        };
        velocity.0 = next.with_y(velocity.0.y);
    }
}

/// PhysicsSet: integrate velocity into position. Walking bodies fall under
/// scaled gravity and stand on the level floor; flying bodies only move.
pub fn integrate_bodies(
    tuning: Res<Tuning>,
    level: Option<Res<CurrentLevel>>,
    mut bodies: Query<(&mut Transform, &mut Velocity, &Movement), With<PlayerCharacter>>,
) {
    let dt = tuning.dt;
    let floor = level.as_ref().map(|level| level.floor_height);
    for (mut transform, mut velocity, movement) in &mut bodies {
        let walking = movement.mode == MovementMode::Walking;
        if walking {
            velocity.0.y -= tuning.gravity * movement.gravity_scale * dt;
        }
        transform.translation += velocity.0 * dt;
        if let Some(floor) = floor.filter(|_| walking)
            && transform.translation.y < floor
        {
            transform.translation.y = floor;
            velocity.0.y = velocity.0.y.max(0.0);
        }
    }
}
