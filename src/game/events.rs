use bevy::prelude::*;

use super::components::NetId;
use super::level::layout::LevelSpec;

/// Authoritative game events, applied only where the simulation has authority.
#[derive(Message, Debug, Clone)]
pub enum GameEvent {
    DealDamage {
        /// Instigating character.
        src: Option<Entity>,
        dst: Entity,
        amount: f32,
    },
}

/// Where a relayed message entered this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    Local,
    Remote,
}

/// Early termination request for a hook shot, raised by the priority
/// target's dash. Honoured only on the instance controlling `owner`.
#[derive(Message, Debug, Clone, Copy)]
pub struct HookCancelRequested {
    pub owner: NetId,
    pub origin: MessageOrigin,
}

/// Presentation notifications for animation and effects.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct HookCue {
    pub owner: NetId,
    pub kind: HookCueKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HookCueKind {
    ShotStarted { valid_target: bool },
    TravelStarted { target_location: Vec3 },
    Explosion { location: Vec3 },
    ShotEnded,
}

/// Replace the active level.
#[derive(Message, Debug, Clone)]
pub struct LoadLevel(pub LevelSpec);

/// End the active level: despawn its entities and drop its anchors.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct LevelTeardown;

/// Re-read tuning.ron into the `Tuning` resource.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ReloadTuning;
