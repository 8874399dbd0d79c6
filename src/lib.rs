//! Gorilla - a two-player artillery duel over a destructible skyline
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain, projectile physics, match state)
//! - `config`: Data-driven match and terrain tuning
//! - `highscores`: Top-10 leaderboard
//! - `persistence`: Flat-file save/load of suspended matches and high scores

pub mod config;
pub mod highscores;
pub mod persistence;
pub mod sim;

pub use config::{ConfigError, MatchConfig, TerrainConfig};
pub use highscores::HighScores;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World dimensions (pixels, y grows downward)
    pub const WORLD_WIDTH: f32 = 800.0;
    pub const WORLD_HEIGHT: f32 = 600.0;

    /// Downward acceleration (pixels/s²)
    pub const GRAVITY: f32 = 300.0;
    /// Step applied by a single gravity adjustment
    pub const GRAVITY_STEP: f32 = 10.0;
    pub const GRAVITY_MIN: f32 = 50.0;
    pub const GRAVITY_MAX: f32 = 1000.0;

    /// Horizontal acceleration per unit of wind (pixels/s²)
    pub const WIND_ACCEL: f32 = 5.0;
    /// Wind is drawn from [-WIND_MAX, WIND_MAX]
    pub const WIND_MAX: f32 = 10.0;

    /// Launch speed = power * VELOCITY_FACTOR
    pub const VELOCITY_FACTOR: f32 = 5.0;
    pub const ANGLE_MAX: f32 = 180.0;
    pub const POWER_MAX: f32 = 100.0;
    pub const DEFAULT_ANGLE: f32 = 45.0;
    pub const DEFAULT_POWER: f32 = 50.0;

    pub const PROJECTILE_RADIUS: f32 = 5.0;
    pub const ACTOR_RADIUS: f32 = 20.0;
    /// Extra clearance beyond the combined radii when spawning a projectile
    pub const SPAWN_MARGIN: f32 = 4.0;
    /// Seconds before a projectile can hit its own thrower
    pub const SELF_HIT_GRACE: f32 = 0.5;

    pub const MAX_HEALTH: i32 = 100;
    pub const DAMAGE_PER_HIT: i32 = 35;
    pub const SELF_DAMAGE_MULTIPLIER: f32 = 1.5;
    pub const DAMAGE_BUILDING_COLLAPSE: i32 = 20;

    /// Crater radius carved on terrain impact
    pub const EXPLOSION_RADIUS: f32 = 30.0;
    /// Visual lifetime of an explosion (seconds)
    pub const EXPLOSION_DURATION: f32 = 0.5;

    /// Building generation
    pub const BUILDING_MIN_WIDTH: f32 = 60.0;
    pub const BUILDING_MAX_WIDTH: f32 = 110.0;
    pub const BUILDING_MIN_HEIGHT: f32 = 100.0;
    pub const BUILDING_MAX_HEIGHT: f32 = 300.0;
    pub const TALL_BUILDING_CHANCE: f64 = 0.15;
    pub const TALL_BUILDING_MIN_HEIGHT: f32 = 320.0;
    pub const TALL_BUILDING_MAX_HEIGHT: f32 = 420.0;

    /// Occupancy grid resolution (pixels per cell edge)
    pub const OCCUPANCY_CELL_SIZE: f32 = 4.0;
    /// Base band is the lesser of this many pixels and BASE_BAND_FRACTION of the height
    pub const BASE_BAND_PX: f32 = 20.0;
    pub const BASE_BAND_FRACTION: f32 = 0.2;
    /// Buildings collapse when less than this fraction of the base band is solid
    pub const COLLAPSE_THRESHOLD: f32 = 0.3;
}

/// Unit launch direction for an angle in degrees (0 = right, 90 = straight up).
///
/// Screen space: y grows downward, so "up" is negative y.
#[inline]
pub fn direction_from_degrees(angle_deg: f32) -> Vec2 {
    let rad = angle_deg.to_radians();
    Vec2::new(rad.cos(), -rad.sin())
}

/// Angle as seen by the given actor; the right-hand actor mirrors it to throw leftward
#[inline]
pub fn mirrored_angle(angle_deg: f32, actor_index: usize) -> f32 {
    if actor_index == 0 {
        angle_deg
    } else {
        180.0 - angle_deg
    }
}
