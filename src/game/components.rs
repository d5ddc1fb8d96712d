use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ── Marker components ───────────────────────────────────────────────

/// The character that fires the hook shot.
#[derive(Component)]
pub struct HookOwner;

/// The other playable character; always a hook candidate.
#[derive(Component)]
pub struct PriorityTarget;

/// Playable characters are never damaged by hook travel.
#[derive(Component)]
pub struct PlayerCharacter;

/// Entity is driven by input on this instance.
#[derive(Component)]
pub struct LocallyControlled;

/// Marker: tag all level entities for cleanup on teardown.
#[derive(Component)]
pub struct InLevel;

/// Stable identity shared by every instance simulating the same level.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetId(pub u32);

// ── Movement state ──────────────────────────────────────────────────

#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub Vec3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementMode {
    #[default]
    Walking,
    /// Unconstrained motion, no gravity, no floor snapping.
    Flying,
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub mode: MovementMode,
    pub gravity_scale: f32,
    /// Scale restored when a hook shot ends.
    pub default_gravity_scale: f32,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            mode: MovementMode::Walking,
            gravity_scale: 1.0,
            default_gravity_scale: 1.0,
        }
    }
}

/// Input is accepted from the local player while open.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGate {
    pub open: bool,
}

impl Default for InputGate {
    fn default() -> Self {
        Self { open: true }
    }
}

// ── Health ──────────────────────────────────────────────────────────

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }
}

/// Server-written damage gate; closed while the hook owner travels.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanBeDamaged(pub bool);

impl Default for CanBeDamaged {
    fn default() -> Self {
        Self(true)
    }
}

// ── Hook cooldown ───────────────────────────────────────────────────

#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct HookCooldown {
    pub remaining: f32,
}

impl HookCooldown {
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn start(&mut self, seconds: f32) {
        self.remaining = self.remaining.max(seconds);
    }

    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }
}
