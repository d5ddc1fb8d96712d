use bevy::prelude::*;

use crate::game::components::{InLevel, NetId};

/// Collision-resolution effect left where the owner struck the priority
/// target. Knockback systems read `travel_distance` to scale their force.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct HookImpact {
    pub travel_distance: f32,
    pub causer: NetId,
}

/// Absolute time (seconds since startup) at which an impact disappears.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct ImpactExpiresAt(pub f64);

pub fn spawn_impact(
    commands: &mut Commands,
    now: f64,
    location: Vec3,
    travel_distance: f32,
    causer: NetId,
    lifetime: f32,
) -> Entity {
    info!(
        "[HookImpact] at ({:.1}, {:.1}, {:.1}) travel={:.1} causer={:?}",
        location.x, location.y, location.z, travel_distance, causer
    );
    commands
        .spawn((
            HookImpact {
                travel_distance,
                causer,
            },
            ImpactExpiresAt(now + lifetime as f64),
            Transform::from_translation(location),
            InLevel,
        ))
        .id()
}

pub fn expire_impacts(
    mut commands: Commands,
    time: Res<Time>,
    impacts: Query<(Entity, &ImpactExpiresAt), With<HookImpact>>,
) {
    let now = time.elapsed_secs_f64();
    for (entity, expires) in &impacts {
        if now >= expires.0 {
            commands.entity(entity).despawn();
        }
    }
}
