//! Thrown projectile integration and impact classification
//!
//! One projectile is simulated at a time. Each step integrates gravity and
//! wind (semi-implicit Euler, no substeps) and reports what the projectile ran
//! into, if anything.

use glam::Vec2;

use super::terrain::Terrain;
use crate::config::MatchConfig;
use crate::{direction_from_degrees, mirrored_angle};

/// The in-flight projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Index of the actor that threw it
    pub owner: usize,
    /// Seconds since launch
    pub time_alive: f32,
}

impl Projectile {
    /// Launch from `owner_pos` using the shared angle convention.
    ///
    /// The projectile spawns outside the thrower's hitbox, offset along the
    /// launch direction by the combined radii plus a margin.
    pub fn launch(
        owner: usize,
        owner_pos: Vec2,
        angle_deg: f32,
        power: f32,
        config: &MatchConfig,
    ) -> Self {
        let dir = direction_from_degrees(mirrored_angle(angle_deg, owner));
        Self {
            pos: owner_pos + dir * config.spawn_distance(),
            vel: dir * power * config.velocity_factor,
            owner,
            time_alive: 0.0,
        }
    }

    /// Heading in radians, for orienting the sprite
    pub fn heading(&self) -> f32 {
        self.vel.y.atan2(self.vel.x)
    }
}

/// Forces acting on the projectile this step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Physics {
    /// Downward acceleration
    pub gravity: f32,
    /// Horizontal acceleration per unit of wind
    pub wind_accel: f32,
    /// Signed wind strength
    pub wind: f32,
}

/// What the projectile can hit
#[derive(Debug, Clone, Copy)]
pub struct Arena<'a> {
    pub terrain: &'a Terrain,
    pub actors: [Vec2; 2],
    pub projectile_radius: f32,
    pub actor_radius: f32,
    /// Seconds during which the thrower cannot be hit by their own projectile
    pub self_hit_grace: f32,
}

impl<'a> Arena<'a> {
    pub fn new(terrain: &'a Terrain, actors: [Vec2; 2], config: &MatchConfig) -> Self {
        Self {
            terrain,
            actors,
            projectile_radius: config.projectile_radius,
            actor_radius: config.actor_radius,
            self_hit_grace: config.self_hit_grace,
        }
    }

    fn out_of_bounds(&self, pos: Vec2) -> bool {
        // Leaving through the top is allowed; the projectile comes back down
        pos.x < 0.0 || pos.x > self.terrain.width || pos.y > self.terrain.height
    }
}

/// Result of a single step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Flying,
    OutOfBounds,
    TerrainImpact { building: usize, point: Vec2 },
    ActorImpact { target: usize, point: Vec2 },
    SelfImpact { point: Vec2 },
}

impl Outcome {
    /// Every outcome except `Flying` ends the projectile
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Flying)
    }

    /// Where the projectile detonated, if it did
    pub fn impact_point(&self) -> Option<Vec2> {
        match *self {
            Outcome::TerrainImpact { point, .. }
            | Outcome::ActorImpact { point, .. }
            | Outcome::SelfImpact { point } => Some(point),
            Outcome::Flying | Outcome::OutOfBounds => None,
        }
    }
}

/// Advance the projectile by `dt` and classify where it ended up.
///
/// Checks run in fixed precedence: world bounds, terrain, opponent, then
/// the thrower once the grace period has passed.
pub fn step(projectile: &mut Projectile, dt: f32, physics: &Physics, arena: &Arena) -> Outcome {
    projectile.vel.x += physics.wind * physics.wind_accel * dt;
    projectile.vel.y += physics.gravity * dt;
    projectile.pos += projectile.vel * dt;
    projectile.time_alive += dt;

    let pos = projectile.pos;

    if arena.out_of_bounds(pos) {
        return Outcome::OutOfBounds;
    }

    if let Some(building) = arena.terrain.hit_test(pos) {
        return Outcome::TerrainImpact {
            building,
            point: pos,
        };
    }

    let hit_distance = arena.projectile_radius + arena.actor_radius;
    let owner = projectile.owner;
    let target = 1 - owner;

    if pos.distance(arena.actors[target]) <= hit_distance {
        return Outcome::ActorImpact { target, point: pos };
    }

    if projectile.time_alive >= arena.self_hit_grace
        && pos.distance(arena.actors[owner]) <= hit_distance
    {
        return Outcome::SelfImpact { point: pos };
    }

    Outcome::Flying
}
