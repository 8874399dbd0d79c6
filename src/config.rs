//! Match and terrain tuning
//!
//! Defaults come from `crate::consts`; any field can be overridden from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// A tuning value outside its usable range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("world must be at least 1x1, got {width}x{height}")]
    WorldSize { width: f32, height: f32 },
    #[error("{name} range is empty: {min}..{max}")]
    EmptyRange { name: &'static str, min: f32, max: f32 },
    #[error("self-damage multiplier must exceed 1.0, got {0}")]
    SelfDamageMultiplier(f32),
    #[error("collapse threshold must be in (0, 1], got {0}")]
    CollapseThreshold(f32),
    #[error("occupancy cell size must be positive, got {0}")]
    CellSize(f32),
    #[error("tall building chance must be in [0, 1], got {0}")]
    TallChance(f64),
}

/// Procedural skyline generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Probability that a building uses the tall height range
    pub tall_chance: f64,
    pub tall_min_height: f32,
    pub tall_max_height: f32,
    /// Occupancy resolution (pixels per cell edge; 1.0 = per-pixel)
    pub cell_size: f32,
    pub base_band_px: f32,
    pub base_band_fraction: f32,
    pub collapse_threshold: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            min_width: BUILDING_MIN_WIDTH,
            max_width: BUILDING_MAX_WIDTH,
            min_height: BUILDING_MIN_HEIGHT,
            max_height: BUILDING_MAX_HEIGHT,
            tall_chance: TALL_BUILDING_CHANCE,
            tall_min_height: TALL_BUILDING_MIN_HEIGHT,
            tall_max_height: TALL_BUILDING_MAX_HEIGHT,
            cell_size: OCCUPANCY_CELL_SIZE,
            base_band_px: BASE_BAND_PX,
            base_band_fraction: BASE_BAND_FRACTION,
            collapse_threshold: COLLAPSE_THRESHOLD,
        }
    }
}

/// Everything a match needs from setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub world_width: f32,
    pub world_height: f32,

    // === Physics ===
    pub gravity: f32,
    pub gravity_step: f32,
    pub gravity_min: f32,
    pub gravity_max: f32,
    pub wind_accel: f32,
    pub wind_max: f32,
    pub velocity_factor: f32,

    // === Hitboxes ===
    pub projectile_radius: f32,
    pub actor_radius: f32,
    pub spawn_margin: f32,
    pub self_hit_grace: f32,

    // === Damage ===
    pub max_health: i32,
    pub damage_per_hit: i32,
    pub self_damage_multiplier: f32,
    pub building_collapse_damage: i32,
    pub explosion_radius: f32,
    /// Only used to age explosion records for the renderer
    pub explosion_duration: f32,

    // === Aim ===
    pub initial_angle: f32,
    pub initial_power: f32,

    pub terrain: TerrainConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,

            gravity: GRAVITY,
            gravity_step: GRAVITY_STEP,
            gravity_min: GRAVITY_MIN,
            gravity_max: GRAVITY_MAX,
            wind_accel: WIND_ACCEL,
            wind_max: WIND_MAX,
            velocity_factor: VELOCITY_FACTOR,

            projectile_radius: PROJECTILE_RADIUS,
            actor_radius: ACTOR_RADIUS,
            spawn_margin: SPAWN_MARGIN,
            self_hit_grace: SELF_HIT_GRACE,

            max_health: MAX_HEALTH,
            damage_per_hit: DAMAGE_PER_HIT,
            self_damage_multiplier: SELF_DAMAGE_MULTIPLIER,
            building_collapse_damage: DAMAGE_BUILDING_COLLAPSE,
            explosion_radius: EXPLOSION_RADIUS,
            explosion_duration: EXPLOSION_DURATION,

            initial_angle: DEFAULT_ANGLE,
            initial_power: DEFAULT_POWER,

            terrain: TerrainConfig::default(),
        }
    }
}

impl MatchConfig {
    /// Damage taken by a thrower hit by their own projectile
    pub fn self_damage(&self) -> i32 {
        (self.damage_per_hit as f32 * self.self_damage_multiplier).round() as i32
    }

    /// Combined projectile + actor hitbox radius
    pub fn hit_distance(&self) -> f32 {
        self.projectile_radius + self.actor_radius
    }

    /// Distance from the thrower's center at which projectiles spawn
    pub fn spawn_distance(&self) -> f32 {
        self.hit_distance() + self.spawn_margin
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if ![self.world_width, self.world_height]
            .iter()
            .all(|d| (1.0_f32..).contains(d))
        {
            return Err(ConfigError::WorldSize {
                width: self.world_width,
                height: self.world_height,
            });
        }
        let t = &self.terrain;
        for (name, min, max) in [
            ("building width", t.min_width, t.max_width),
            ("building height", t.min_height, t.max_height),
            ("tall building height", t.tall_min_height, t.tall_max_height),
            ("gravity", self.gravity_min, self.gravity_max),
        ] {
            if min <= 0.0 || min > max {
                return Err(ConfigError::EmptyRange { name, min, max });
            }
        }
        if self.self_damage() <= self.damage_per_hit {
            return Err(ConfigError::SelfDamageMultiplier(self.self_damage_multiplier));
        }
        if !(t.collapse_threshold > 0.0 && t.collapse_threshold <= 1.0) {
            return Err(ConfigError::CollapseThreshold(t.collapse_threshold));
        }
        if t.cell_size <= 0.0 {
            return Err(ConfigError::CellSize(t.cell_size));
        }
        if !(0.0..=1.0).contains(&t.tall_chance) {
            return Err(ConfigError::TallChance(t.tall_chance));
        }
        Ok(())
    }

    /// Load a config file, falling back to defaults when missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                log::info!("No config at {} ({}), using defaults", path.display(), e);
                return Self::default();
            }
        };

        let config = match serde_json::from_str::<MatchConfig>(&json) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Malformed config {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match config.validate() {
            Ok(()) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Rejected config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
