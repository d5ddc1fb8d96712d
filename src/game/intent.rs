use bevy::prelude::*;

/// Input intent: written by the input layer, consumed in FixedUpdate.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    /// Desired horizontal movement direction (normalized or zero).
    pub move_dir: Vec3,
    /// Whether the player wants to fire the hook shot this tick.
    pub hook: bool,
    /// Priority target only: dash, which also cancels an incoming hook shot.
    pub dash: bool,
}

impl Intent {
    /// Intent as seen through the input gate; a closed gate drops everything.
    pub fn gated(&self, open: bool) -> Self {
        if open { *self } else { Self::default() }
    }
}
