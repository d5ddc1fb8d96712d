use bevy::prelude::*;

use crate::config::tuning::HookTuning;
use crate::game::view::ViewProjection;

/// Targeting reticle state for the local owner.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct HookIndicator {
    pub visible: bool,
    /// Pixel position of the current target, top-left origin.
    pub screen_position: Option<Vec2>,
}

impl HookIndicator {
    pub const HIDDEN: Self = Self {
        visible: false,
        screen_position: None,
    };

    /// Reticle for the selector's current target. Hidden with no target,
    /// while travelling, on cooldown, or early in the level.
    pub fn evaluate(
        target_location: Option<Vec3>,
        traveling: bool,
        on_cooldown: bool,
        level_elapsed: f32,
        tuning: &HookTuning,
        view: &ViewProjection,
    ) -> Self {
        let Some(location) = target_location else {
            return Self::HIDDEN;
        };
        if traveling || on_cooldown || level_elapsed < tuning.indicator_grace_period {
            return Self::HIDDEN;
        }
        Self {
            visible: true,
            screen_position: view.project(location),
        }
    }
}
