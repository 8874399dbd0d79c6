//! Match state and core simulation types
//!
//! All state that must be persisted for Continue lives in `MatchSnapshot`.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::projectile::{Outcome, Physics, Projectile};
use super::terrain::{ActorSpot, Terrain};
use crate::config::MatchConfig;

/// Current phase of a match
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchPhase {
    /// Waiting for the current actor to adjust aim and fire
    Aiming,
    /// A projectile is in the air
    InFlight(Projectile),
    /// The projectile ended; effects are applied on the next tick
    Resolving(Outcome),
    /// Someone ran out of health
    MatchOver { winner: usize },
}

/// One of the two competitors
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub name: String,
    /// Center of the actor's hitbox
    pub position: Vec2,
    /// Building the actor was placed on, if any
    pub building: Option<usize>,
    pub health: i32,
    /// Matches won this session
    pub score: u32,
}

impl Actor {
    pub fn new(name: String, spot: ActorSpot, max_health: i32) -> Self {
        Self {
            name,
            position: spot.position,
            building: spot.building,
            health: max_health,
            score: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply damage, never dropping below zero. Returns the health lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health - amount).max(0);
        before - self.health
    }

    /// Axis-aligned hitbox corners
    pub fn bounds(&self, radius: f32) -> (Vec2, Vec2) {
        (
            self.position - Vec2::splat(radius),
            self.position + Vec2::splat(radius),
        )
    }
}

/// Transient explosion record for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub position: Vec2,
    pub radius: f32,
    pub elapsed: f32,
    pub duration: f32,
}

impl Explosion {
    pub fn new(position: Vec2, radius: f32, duration: f32) -> Self {
        Self {
            position,
            radius,
            elapsed: 0.0,
            duration,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Why an actor lost health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageCause {
    Hit,
    SelfHit,
    Collapse,
}

/// Notable things that happened, drained by the session and renderer each frame
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    Fired {
        shooter: usize,
        angle: f32,
        power: f32,
    },
    Impact(Outcome),
    BuildingCollapsed {
        building: usize,
    },
    ActorDamaged {
        actor: usize,
        amount: i32,
        health: i32,
        cause: DamageCause,
    },
    TurnChanged {
        turn: usize,
        wind: f32,
    },
    GravityChanged {
        gravity: f32,
    },
    MatchOver {
        winner: usize,
        scores: [u32; 2],
    },
    /// In-flight shot discarded for a return to the menu
    Suspended,
}

/// Everything needed to resume a match later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub names: [String; 2],
    pub scores: [u32; 2],
    /// Older saves carry no health; those resume at full health
    #[serde(default)]
    pub health: Option<[i32; 2]>,
    pub turn: usize,
    pub positions: [Vec2; 2],
    pub buildings: [Option<usize>; 2],
    pub terrain: Terrain,
    pub gravity: f32,
    #[serde(default)]
    pub wind: f32,
    pub angle: f32,
    pub power: f32,
    #[serde(default)]
    pub round: u32,
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct MatchState {
    pub config: MatchConfig,
    /// Matches played this session (0-based)
    pub round: u32,
    pub actors: [Actor; 2],
    /// Index of the actor allowed to aim and fire
    pub turn: usize,
    /// Degrees, 0..=180, mirrored for the right-hand actor
    pub angle: f32,
    /// 0..=100
    pub power: f32,
    pub wind: f32,
    /// Runtime-adjustable; starts at `config.gravity`
    pub gravity: f32,
    pub phase: MatchPhase,
    pub terrain: Terrain,
    pub explosions: Vec<Explosion>,
    pub events: Vec<MatchEvent>,
    rng: Pcg32,
}

impl MatchState {
    /// Start a fresh session: new skyline, both actors at full health, actor 0 first
    pub fn new(config: MatchConfig, names: [String; 2], seed: u64) -> Self {
        let terrain = Terrain::empty(config.world_width, config.world_height);
        let [a, b] = names;
        let placeholder = ActorSpot {
            building: None,
            position: Vec2::ZERO,
        };
        let mut state = Self {
            round: 0,
            actors: [
                Actor::new(a, placeholder, config.max_health),
                Actor::new(b, placeholder, config.max_health),
            ],
            turn: 0,
            angle: config.initial_angle,
            power: config.initial_power,
            wind: 0.0,
            gravity: config.gravity,
            phase: MatchPhase::Aiming,
            terrain,
            explosions: Vec::new(),
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            config,
        };
        state.setup_round();
        state
    }

    /// Resume a saved match. Returns `None` if the snapshot is inconsistent.
    pub fn from_snapshot(config: MatchConfig, snapshot: MatchSnapshot, seed: u64) -> Option<Self> {
        if snapshot.turn > 1 || !snapshot.terrain.is_consistent() {
            log::warn!("Discarding inconsistent saved match");
            return None;
        }
        let health = snapshot
            .health
            .unwrap_or([config.max_health, config.max_health]);
        let [name_a, name_b] = snapshot.names;
        let make = |name: String, i: usize| Actor {
            name,
            position: snapshot.positions[i],
            building: snapshot.buildings[i],
            health: health[i].clamp(0, config.max_health),
            score: snapshot.scores[i],
        };
        let actors = [make(name_a, 0), make(name_b, 1)];

        if actors.iter().any(|a| !a.is_alive()) {
            log::warn!("Discarding saved match with a defeated actor");
            return None;
        }

        Some(Self {
            round: snapshot.round,
            actors,
            turn: snapshot.turn,
            angle: snapshot.angle,
            power: snapshot.power,
            wind: snapshot.wind,
            gravity: snapshot.gravity,
            phase: MatchPhase::Aiming,
            terrain: snapshot.terrain,
            explosions: Vec::new(),
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            config,
        })
    }

    /// Serializable copy of the persistent parts of the match
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            names: [self.actors[0].name.clone(), self.actors[1].name.clone()],
            scores: [self.actors[0].score, self.actors[1].score],
            health: Some([self.actors[0].health, self.actors[1].health]),
            turn: self.turn,
            positions: self.actor_positions(),
            buildings: [self.actors[0].building, self.actors[1].building],
            terrain: self.terrain.clone(),
            gravity: self.gravity,
            wind: self.wind,
            angle: self.angle,
            power: self.power,
            round: self.round,
        }
    }

    /// Begin the next match of the session, keeping names and scores.
    ///
    /// The loser of the previous match throws first.
    pub fn next_match(&mut self) {
        if let MatchPhase::MatchOver { winner } = self.phase {
            self.turn = 1 - winner;
        }
        self.round += 1;
        self.setup_round();
    }

    fn setup_round(&mut self) {
        let config = &self.config;
        self.terrain = Terrain::generate(
            config.world_width,
            config.world_height,
            &config.terrain,
            &mut self.rng,
        );
        let spots = self.terrain.place_actors(config.actor_radius, &mut self.rng);
        for (actor, spot) in self.actors.iter_mut().zip(spots) {
            actor.position = spot.position;
            actor.building = spot.building;
            actor.health = config.max_health;
        }
        self.angle = config.initial_angle;
        self.power = config.initial_power;
        self.phase = MatchPhase::Aiming;
        self.explosions.clear();
        self.reroll_wind();

        log::info!(
            "Round {} begins: {} buildings, wind {:+}, {} throws first",
            self.round + 1,
            self.terrain.buildings.len(),
            self.wind,
            self.actors[self.turn].name
        );
    }

    /// Draw a new whole-number wind from the configured range
    pub fn reroll_wind(&mut self) {
        let max = self.config.wind_max.abs();
        let wind: f32 = self.rng.random_range(-max..=max);
        self.wind = wind.round();
    }

    pub fn projectile(&self) -> Option<&Projectile> {
        match &self.phase {
            MatchPhase::InFlight(p) => Some(p),
            _ => None,
        }
    }

    pub fn winner(&self) -> Option<usize> {
        match self.phase {
            MatchPhase::MatchOver { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.winner().is_some()
    }

    pub fn actor_positions(&self) -> [Vec2; 2] {
        [self.actors[0].position, self.actors[1].position]
    }

    pub fn scores(&self) -> [u32; 2] {
        [self.actors[0].score, self.actors[1].score]
    }

    pub fn physics(&self) -> Physics {
        Physics {
            gravity: self.gravity,
            wind_accel: self.config.wind_accel,
            wind: self.wind,
        }
    }

    /// Take all events queued since the last drain
    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.events)
    }
}
