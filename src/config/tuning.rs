use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// All tunable simulation parameters, loaded from tuning.ron.
#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub dt: f32,
    /// Downward acceleration applied to walking bodies (units / s²).
    pub gravity: f32,
    pub max_walk_speed: f32,
    pub input_accel: f32,
    pub hook: HookTuning,
}

/// Hook-shot parameters. Distances are world units, speeds units per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookTuning {
    pub outward_speed: f32,
    pub retract_speed: f32,
    pub travel_speed: f32,
    /// Ceiling on time spent in any active phase before a forced exit.
    pub fail_safe_length: f32,
    pub reached_target_tolerance: f32,
    /// Squared distance at which a retracting arm counts as back at the owner.
    pub retract_done_dist_sq: f32,
    /// Exit velocity divisor after reaching an anchor.
    pub exit_velocity_damping: f32,
    pub travel_damage: f32,
    pub cooldown: f32,
    /// Aim point lift when targeting the priority target.
    pub priority_target_height_offset: f32,
    pub max_shot_distance_on_block: f32,
    pub anchor_facing_tolerance: f32,
    pub priority_facing_tolerance: f32,
    /// Obstruction sweeps use the owner capsule scaled by this factor.
    pub sweep_capsule_scale: f32,
    pub arm_offset_right: f32,
    pub arm_offset_left: f32,
    pub arm_offset_vertical: f32,
    /// Reticle stays hidden this long after a level starts.
    pub indicator_grace_period: f32,
    pub impact_effect_lifetime: f32,
    /// Server clamps requested exit speed to `travel_speed * max_exit_speed_factor`.
    pub max_exit_speed_factor: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            gravity: 980.0,
            max_walk_speed: 600.0,
            input_accel: 4000.0,
            hook: HookTuning::default(),
        }
    }
}

impl Default for HookTuning {
    fn default() -> Self {
        Self {
            outward_speed: 3000.0,
            retract_speed: 4000.0,
            travel_speed: 2000.0,
            fail_safe_length: 3.0,
            reached_target_tolerance: 100.0,
            retract_done_dist_sq: 100.0,
            exit_velocity_damping: 2.0,
            travel_damage: 3.0,
            cooldown: 2.0,
            priority_target_height_offset: 50.0,
            max_shot_distance_on_block: 1500.0,
            anchor_facing_tolerance: -0.1,
            priority_facing_tolerance: 0.0,
            sweep_capsule_scale: 0.5,
            arm_offset_right: 30.0,
            arm_offset_left: -30.0,
            arm_offset_vertical: 40.0,
            indicator_grace_period: 5.0,
            impact_effect_lifetime: 2.0,
            max_exit_speed_factor: 1.0,
        }
    }
}

impl Tuning {
    /// `<data_dir>/hookshot`, or `./hookshot` when the platform has none.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hookshot")
    }

    pub fn file_path() -> PathBuf {
        Self::data_dir().join("tuning.ron")
    }

    pub fn load_or_default() -> Self {
        Self::load_from(&Self::file_path())
    }

    /// Read `path`. A missing file is created with defaults; an unreadable
    /// or malformed one is left alone and defaults are used.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            let defaults = Self::default();
            defaults.save_to(path);
            return defaults;
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| ron::from_str::<Self>(&text).map_err(|e| e.to_string()));
        parsed.unwrap_or_else(|e| {
            warn!("Tuning at {} unusable ({e}), using defaults", path.display());
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let written = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| e.to_string())
            .and_then(|text| std::fs::write(path, text).map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!("Could not save tuning to {}: {e}", path.display());
        }
    }

    /// Re-read tuning.ron in place.
    pub fn reload(&mut self) {
        *self = Self::load_or_default();
        info!("Tuning reloaded");
    }

    /// Hex SHA-256 of the JSON encoding. Peers with different fingerprints
    /// predict hook motion differently from the server.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}
