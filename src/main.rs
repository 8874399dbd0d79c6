//! Gorilla entry point
//!
//! Headless session driver: resumes a saved match (or starts one), plays a
//! scripted volley on the fixed simulation timestep and persists the result.
//!
//! Usage: `gorilla [DATA_DIR] [SEED]`

use gorilla::MatchConfig;
use gorilla::consts::{MAX_SUBSTEPS, SIM_DT};
use gorilla::highscores::{format_date, now_timestamp};
use gorilla::persistence::{Persisted, Storage};
use gorilla::sim::{Intent, MatchEvent, MatchPhase, MatchState, Outcome, apply_intent, tick};

/// Simulated display refresh
const FRAME_DT: f32 = 1.0 / 60.0;
/// Shots before the demo suspends the match
const MAX_SHOTS: u32 = 24;

struct Session {
    state: MatchState,
    storage: Storage,
    accumulator: f32,
    shots: u32,
}

impl Session {
    fn start(storage: Storage, seed: u64) -> Self {
        let config = MatchConfig::load_or_default(&storage.dir().join("config.json"));
        let resumed = storage
            .load_match()
            .and_then(|snapshot| MatchState::from_snapshot(config.clone(), snapshot, seed));

        let state = match resumed {
            Some(state) => {
                log::info!("Resuming saved match (round {})", state.round + 1);
                state
            }
            None => {
                let names = ["Player 1".to_string(), "Player 2".to_string()];
                MatchState::new(config, names, seed)
            }
        };

        match storage.load_high_scores().top_score() {
            Some(best) => log::info!("Best on the board: {} wins", best),
            None => log::info!("High score board is empty"),
        }

        Self {
            state,
            storage,
            accumulator: 0.0,
            shots: 0,
        }
    }

    /// Aim and throw for whoever's turn it is. The script sweeps angle and
    /// power so successive shots land at different distances.
    fn take_shot(&mut self) {
        let n = self.shots as f32;
        let angle = 35.0 + (n * 7.0) % 30.0;
        let power = 45.0 + (n * 11.0) % 35.0;

        let intents = [
            Intent::AdjustAngle(angle - self.state.angle),
            Intent::AdjustPower(power - self.state.power),
            Intent::Fire,
        ];
        for intent in intents {
            if let Err(e) = apply_intent(&mut self.state, intent) {
                log::warn!("{:?} rejected: {}", intent, e);
                return;
            }
        }
        self.shots += 1;
    }

    /// One display frame: run as many fixed ticks as have accumulated
    fn update(&mut self, dt: f32) {
        self.accumulator += dt.min(0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        self.report_events();
    }

    fn report_events(&mut self) {
        for event in self.state.drain_events() {
            self.report(&event);
        }
    }

    fn report(&self, event: &MatchEvent) {
        let actors = &self.state.actors;
        match event {
            MatchEvent::Fired {
                shooter,
                angle,
                power,
            } => println!("{} throws at {angle}° with power {power}", actors[*shooter].name),
            MatchEvent::Impact(Outcome::OutOfBounds) => println!("  ... and it sails off the map"),
            MatchEvent::Impact(Outcome::TerrainImpact { building, .. }) => {
                println!("  ... and hits building {building}")
            }
            MatchEvent::Impact(_) => {}
            MatchEvent::BuildingCollapsed { building } => {
                println!("  Building {building} collapses!")
            }
            MatchEvent::ActorDamaged { actor, amount, health, cause } => println!(
                "  {} loses {amount} health ({cause:?}), {health} left",
                actors[*actor].name
            ),
            MatchEvent::TurnChanged { turn, wind } => {
                println!("{}'s turn, wind {wind:+}", actors[*turn].name)
            }
            MatchEvent::GravityChanged { gravity } => println!("Gravity is now {gravity}"),
            MatchEvent::MatchOver { winner, scores } => println!(
                "{} wins! Score {} - {}",
                actors[*winner].name, scores[0], scores[1]
            ),
            MatchEvent::Suspended => println!("Match suspended"),
        }
    }

    fn run(&mut self) {
        while !self.state.is_over() && self.shots < MAX_SHOTS {
            if self.state.phase == MatchPhase::Aiming {
                self.take_shot();
            }
            self.update(FRAME_DT);
        }
        self.finish();
    }

    fn finish(&mut self) {
        if !self.state.is_over() {
            // A shot still resolving is applied here and may end the match
            if let Err(e) = apply_intent(&mut self.state, Intent::ReturnToMenu) {
                log::warn!("Suspend rejected: {}", e);
            }
            self.report_events();
        }

        match self.storage.persist(&self.state) {
            Ok(Persisted::Finished(scores)) => {
                let now = now_timestamp();
                println!("\nHigh scores:");
                for (i, e) in scores.entries.iter().enumerate() {
                    println!(
                        "{:>2}. {:<12} {:>3}  {}",
                        i + 1,
                        e.name,
                        e.score,
                        format_date(e.timestamp, now)
                    );
                }
            }
            Ok(Persisted::Suspended) => log::info!("Match saved for later"),
            Err(e) => log::error!("Could not save session: {}", e),
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let data_dir = args.next().unwrap_or_else(|| "data".to_string());
    let seed = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(now_timestamp);

    log::info!("Gorilla starting (seed {seed}, data in {data_dir})");
    let mut session = Session::start(Storage::new(data_dir), seed);
    session.run();
}
