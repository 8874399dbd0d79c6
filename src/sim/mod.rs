//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep
//! - Seeded RNG only
//! - Stable iteration order (buildings left to right, actors by index)
//! - No rendering, input or file I/O

pub mod projectile;
pub mod state;
pub mod terrain;
pub mod tick;

pub use projectile::{Arena, Outcome, Physics, Projectile, step};
pub use state::{
    Actor, DamageCause, Explosion, MatchEvent, MatchPhase, MatchSnapshot, MatchState,
};
pub use terrain::{
    ActorSpot, Building, OccupancyGrid, Terrain, check_collapse, damage_building,
};
pub use tick::{Intent, Rejected, apply_intent, tick};
