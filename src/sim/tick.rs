//! Match transitions
//!
//! `apply_intent` handles one discrete input event; `tick` advances the match
//! by one frame. Together they are the only way match state changes.

use thiserror::Error;

use super::projectile::{Arena, Outcome, Projectile, step};
use super::state::{DamageCause, Explosion, MatchEvent, MatchPhase, MatchState};
use super::terrain::damage_building;
use crate::consts::{ANGLE_MAX, POWER_MAX};

/// Discrete player intents, already mapped from raw input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Change the aim angle by this many degrees
    AdjustAngle(f32),
    /// Change the throw power by this amount
    AdjustPower(f32),
    RerollWind,
    Fire,
    /// Change gravity by this many configured steps (usually ±1)
    AdjustGravity(f32),
    ResetGravity,
    /// Leave for the menu; any shot in the air is discarded
    ReturnToMenu,
}

/// Why an intent was refused. The match is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("a projectile is already in flight")]
    ProjectileInFlight,
    #[error("the last shot is still being resolved")]
    Resolving,
    #[error("the match is over")]
    MatchOver,
}

fn rejection(phase: &MatchPhase) -> Rejected {
    match phase {
        MatchPhase::InFlight(_) => Rejected::ProjectileInFlight,
        MatchPhase::Resolving(_) => Rejected::Resolving,
        MatchPhase::Aiming | MatchPhase::MatchOver { .. } => Rejected::MatchOver,
    }
}

/// Apply one intent. Anything other than `ReturnToMenu` requires the aiming phase.
pub fn apply_intent(state: &mut MatchState, intent: Intent) -> Result<(), Rejected> {
    match intent {
        Intent::ReturnToMenu => return suspend(state),
        _ if state.phase != MatchPhase::Aiming => return Err(rejection(&state.phase)),
        Intent::AdjustAngle(delta) => {
            state.angle = (state.angle + delta).clamp(0.0, ANGLE_MAX);
        }
        Intent::AdjustPower(delta) => {
            state.power = (state.power + delta).clamp(0.0, POWER_MAX);
        }
        Intent::RerollWind => state.reroll_wind(),
        Intent::AdjustGravity(steps) => {
            let (min, max) = (state.config.gravity_min, state.config.gravity_max);
            let delta = steps * state.config.gravity_step;
            state.gravity = (state.gravity + delta).clamp(min, max);
            state.events.push(MatchEvent::GravityChanged {
                gravity: state.gravity,
            });
        }
        Intent::ResetGravity => {
            state.gravity = state.config.gravity;
            state.events.push(MatchEvent::GravityChanged {
                gravity: state.gravity,
            });
        }
        Intent::Fire => fire(state),
    }
    Ok(())
}

fn fire(state: &mut MatchState) {
    let shooter = state.turn;
    let projectile = Projectile::launch(
        shooter,
        state.actors[shooter].position,
        state.angle,
        state.power,
        &state.config,
    );
    log::debug!(
        "{} throws: angle {} power {} wind {:+} gravity {}",
        state.actors[shooter].name,
        state.angle,
        state.power,
        state.wind,
        state.gravity
    );
    state.phase = MatchPhase::InFlight(projectile);
    state.events.push(MatchEvent::Fired {
        shooter,
        angle: state.angle,
        power: state.power,
    });
}

/// Abort to the menu. A pending resolution is applied first; an in-flight
/// shot is dropped and the same actor throws again on resume.
fn suspend(state: &mut MatchState) -> Result<(), Rejected> {
    match state.phase {
        MatchPhase::MatchOver { .. } => return Err(Rejected::MatchOver),
        MatchPhase::Resolving(outcome) => resolve(state, outcome),
        MatchPhase::InFlight(_) => {
            log::info!("Shot discarded on return to menu");
            state.phase = MatchPhase::Aiming;
        }
        MatchPhase::Aiming => {}
    }
    if !state.is_over() {
        state.events.push(MatchEvent::Suspended);
    }
    Ok(())
}

/// Advance the match by `dt` seconds
pub fn tick(state: &mut MatchState, dt: f32) {
    for explosion in &mut state.explosions {
        explosion.elapsed += dt;
    }
    state.explosions.retain(|e| !e.is_finished());

    match state.phase {
        MatchPhase::Aiming | MatchPhase::MatchOver { .. } => {}
        MatchPhase::Resolving(outcome) => resolve(state, outcome),
        MatchPhase::InFlight(_) => advance_projectile(state, dt),
    }
}

fn advance_projectile(state: &mut MatchState, dt: f32) {
    let physics = state.physics();
    let actors = state.actor_positions();

    let outcome = match &mut state.phase {
        MatchPhase::InFlight(projectile) => {
            let arena = Arena::new(&state.terrain, actors, &state.config);
            step(projectile, dt, &physics, &arena)
        }
        _ => return,
    };

    if outcome.is_terminal() {
        log::debug!("Shot ended: {:?}", outcome);
        state.events.push(MatchEvent::Impact(outcome));
        state.phase = MatchPhase::Resolving(outcome);
    }
}

fn damage_actor(state: &mut MatchState, actor: usize, amount: i32, cause: DamageCause) {
    let lost = state.actors[actor].take_damage(amount);
    let health = state.actors[actor].health;
    log::info!(
        "{} takes {} damage ({:?}), {} left",
        state.actors[actor].name,
        lost,
        cause,
        health
    );
    state.events.push(MatchEvent::ActorDamaged {
        actor,
        amount: lost,
        health,
        cause,
    });
}

/// Apply the effects of a finished shot, then hand the turn over or end the match
fn resolve(state: &mut MatchState, outcome: Outcome) {
    let shooter = state.turn;
    let opponent = 1 - shooter;

    if let Some(point) = outcome.impact_point() {
        state.explosions.push(Explosion::new(
            point,
            state.config.explosion_radius,
            state.config.explosion_duration,
        ));
    }

    match outcome {
        Outcome::TerrainImpact { building, point } => {
            let radius = state.config.explosion_radius;
            let collapsed = match state.terrain.buildings.get_mut(building) {
                Some(b) => damage_building(b, point, radius, &state.config.terrain),
                None => false,
            };
            if collapsed {
                log::info!("Building {} collapses", building);
                state.events.push(MatchEvent::BuildingCollapsed { building });
                crush_actors(state, building);
            }
        }
        Outcome::ActorImpact { target, .. } => {
            let damage = state.config.damage_per_hit;
            damage_actor(state, target, damage, DamageCause::Hit);
        }
        Outcome::SelfImpact { .. } => {
            let damage = state.config.self_damage();
            damage_actor(state, shooter, damage, DamageCause::SelfHit);
        }
        Outcome::OutOfBounds => {}
        Outcome::Flying => log::warn!("Resolving a shot that never landed"),
    }

    let dead = [!state.actors[0].is_alive(), !state.actors[1].is_alive()];
    let winner = match dead {
        [false, false] => None,
        [true, false] => Some(1),
        [false, true] => Some(0),
        // Both crushed by the same collapse: the thrower caused it
        [true, true] => Some(opponent),
    };

    if let Some(winner) = winner {
        state.actors[winner].score += 1;
        state.phase = MatchPhase::MatchOver { winner };
        let scores = state.scores();
        log::info!(
            "{} wins the match ({} - {})",
            state.actors[winner].name,
            scores[0],
            scores[1]
        );
        state.events.push(MatchEvent::MatchOver { winner, scores });
        return;
    }

    state.turn = opponent;
    if !matches!(outcome, Outcome::SelfImpact { .. }) {
        state.reroll_wind();
    }
    state.phase = MatchPhase::Aiming;
    state.events.push(MatchEvent::TurnChanged {
        turn: state.turn,
        wind: state.wind,
    });
}

/// Damage every actor standing in or on a building that just collapsed
fn crush_actors(state: &mut MatchState, building: usize) {
    let radius = state.config.actor_radius;
    let damage = state.config.building_collapse_damage;
    for i in 0..state.actors.len() {
        let (min, max) = state.actors[i].bounds(radius);
        if state.terrain.buildings[building].intersects(min, max) {
            damage_actor(state, i, damage, DamageCause::Collapse);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::consts::SIM_DT;
    use crate::sim::terrain::{Building, Terrain};
    use glam::Vec2;

    fn names() -> [String; 2] {
        ["Alice".to_string(), "Bob".to_string()]
    }

    /// Open sky with the actors standing in mid-air, far apart
    fn open_match() -> MatchState {
        let mut state = MatchState::new(MatchConfig::default(), names(), 12345);
        state.terrain = Terrain::empty(800.0, 600.0);
        state.actors[0].position = Vec2::new(100.0, 400.0);
        state.actors[1].position = Vec2::new(700.0, 400.0);
        state.actors[0].building = None;
        state.actors[1].building = None;
        state.wind = 0.0;
        state
    }

    /// Tick until the match leaves the in-flight and resolving phases
    fn settle(state: &mut MatchState) {
        for _ in 0..10_000 {
            tick(state, SIM_DT);
            if matches!(state.phase, MatchPhase::Aiming | MatchPhase::MatchOver { .. }) {
                return;
            }
        }
        panic!("match never settled");
    }

    fn shoot(state: &mut MatchState, projectile: Projectile) {
        state.phase = MatchPhase::InFlight(projectile);
        settle(state);
    }

    fn impacts(state: &mut MatchState) -> Vec<Outcome> {
        state
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                MatchEvent::Impact(o) => Some(o),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_aim_adjustments_clamp() {
        let mut state = open_match();
        state.angle = 179.0;
        apply_intent(&mut state, Intent::AdjustAngle(5.0)).unwrap();
        assert_eq!(state.angle, 180.0);
        state.power = 1.0;
        apply_intent(&mut state, Intent::AdjustPower(-5.0)).unwrap();
        assert_eq!(state.power, 0.0);
        apply_intent(&mut state, Intent::AdjustPower(1.0)).unwrap();
        assert_eq!(state.power, 1.0);
    }

    #[test]
    fn test_gravity_adjust_and_reset() {
        let mut state = open_match();
        let start = state.gravity;
        apply_intent(&mut state, Intent::AdjustGravity(1.0)).unwrap();
        assert_eq!(state.gravity, start + state.config.gravity_step);
        apply_intent(&mut state, Intent::AdjustGravity(-2.0)).unwrap();
        assert_eq!(state.gravity, start - state.config.gravity_step);
        assert_eq!(
            state.drain_events().last(),
            Some(&MatchEvent::GravityChanged {
                gravity: start - state.config.gravity_step
            })
        );

        apply_intent(&mut state, Intent::AdjustGravity(1_000.0)).unwrap();
        assert_eq!(state.gravity, state.config.gravity_max);
        apply_intent(&mut state, Intent::ResetGravity).unwrap();
        assert_eq!(state.gravity, state.config.gravity);
        assert_eq!(state.physics().gravity, state.config.gravity);
    }

    #[test]
    fn test_fire_while_in_flight_is_rejected() {
        let mut state = open_match();
        apply_intent(&mut state, Intent::Fire).unwrap();
        let before = state.phase;
        let angle = state.angle;

        assert_eq!(
            apply_intent(&mut state, Intent::Fire),
            Err(Rejected::ProjectileInFlight)
        );
        assert_eq!(
            apply_intent(&mut state, Intent::AdjustAngle(1.0)),
            Err(Rejected::ProjectileInFlight)
        );
        assert_eq!(state.phase, before);
        assert_eq!(state.angle, angle);
    }

    #[test]
    fn test_fire_spawns_offset_projectile() {
        let mut state = open_match();
        apply_intent(&mut state, Intent::Fire).unwrap();
        let p = *state.projectile().unwrap();
        assert_eq!(p.owner, 0);
        assert!(p.pos.distance(state.actors[0].position) > state.config.hit_distance());
        assert!(matches!(
            state.drain_events().as_slice(),
            [MatchEvent::Fired { shooter: 0, .. }]
        ));
    }

    #[test]
    fn test_out_of_bounds_flips_turn_without_damage() {
        let mut state = open_match();
        shoot(
            &mut state,
            Projectile {
                pos: Vec2::new(400.0, 590.0),
                vel: Vec2::new(0.0, 200.0),
                owner: 0,
                time_alive: 0.0,
            },
        );
        assert_eq!(impacts(&mut state), vec![Outcome::OutOfBounds]);
        assert_eq!(state.turn, 1);
        assert_eq!(state.phase, MatchPhase::Aiming);
        assert!(state.actors.iter().all(|a| a.health == 100));
        assert!(state.explosions.is_empty());
    }

    #[test]
    fn test_resolving_is_visible_for_one_tick() {
        let mut state = open_match();
        state.phase = MatchPhase::InFlight(Projectile {
            pos: Vec2::new(400.0, 599.5),
            vel: Vec2::new(0.0, 200.0),
            owner: 0,
            time_alive: 0.0,
        });
        tick(&mut state, SIM_DT);
        assert_eq!(state.phase, MatchPhase::Resolving(Outcome::OutOfBounds));
        assert_eq!(state.turn, 0, "turn never flips on an in-flight tick");
        assert_eq!(
            apply_intent(&mut state, Intent::Fire),
            Err(Rejected::Resolving)
        );
        tick(&mut state, SIM_DT);
        assert_eq!(state.phase, MatchPhase::Aiming);
        assert_eq!(state.turn, 1);
    }

    #[test]
    fn test_opponent_hit_damages_and_flips_turn() {
        let mut state = open_match();
        let target = state.actors[1].position;
        shoot(
            &mut state,
            Projectile {
                pos: target - Vec2::new(40.0, 0.0),
                vel: Vec2::new(600.0, 0.0),
                owner: 0,
                time_alive: 1.0,
            },
        );
        assert_eq!(state.actors[1].health, 100 - state.config.damage_per_hit);
        assert_eq!(state.actors[0].health, 100);
        assert_eq!(state.turn, 1);
        assert_eq!(state.explosions.len(), 1);
    }

    #[test]
    fn test_self_hit_costs_more_than_opponent_hit() {
        let config = MatchConfig::default();
        let mut state = open_match();
        let shooter = state.actors[0].position;
        // Same kinetic state, relative to each victim
        let toward = |victim: Vec2, owner: usize| Projectile {
            pos: victim - Vec2::new(40.0, 0.0),
            vel: Vec2::new(600.0, 0.0),
            owner,
            time_alive: 1.0,
        };
        shoot(&mut state, toward(shooter, 0));
        let self_loss = 100 - state.actors[0].health;

        let mut other = open_match();
        let target = other.actors[1].position;
        shoot(&mut other, toward(target, 0));
        let hit_loss = 100 - other.actors[1].health;

        assert_eq!(self_loss, config.self_damage());
        assert_eq!(hit_loss, config.damage_per_hit);
        assert!(self_loss > hit_loss);
        assert_eq!(state.turn, 1);
    }

    #[test]
    fn test_self_hit_keeps_wind() {
        let mut state = open_match();
        state.wind = 7.0;
        let shooter = state.actors[0].position;
        shoot(
            &mut state,
            Projectile {
                pos: shooter + Vec2::new(0.0, -10.0),
                vel: Vec2::ZERO,
                owner: 0,
                time_alive: 1.0,
            },
        );
        assert_eq!(state.actors[0].health, 100 - state.config.self_damage());
        assert_eq!(state.wind, 7.0);
    }

    #[test]
    fn test_lethal_hit_ends_match_and_scores_once() {
        let mut state = open_match();
        state.actors[1].health = 10;
        let target = state.actors[1].position;
        shoot(
            &mut state,
            Projectile {
                pos: target - Vec2::new(40.0, 0.0),
                vel: Vec2::new(600.0, 0.0),
                owner: 0,
                time_alive: 1.0,
            },
        );
        assert_eq!(state.phase, MatchPhase::MatchOver { winner: 0 });
        assert_eq!(state.actors[1].health, 0);
        assert_eq!(state.scores(), [1, 0]);
        assert_eq!(state.turn, 0);

        // Nothing moves once the match is over
        for _ in 0..10 {
            tick(&mut state, SIM_DT);
        }
        assert_eq!(state.scores(), [1, 0]);
        assert_eq!(apply_intent(&mut state, Intent::Fire), Err(Rejected::MatchOver));
        assert_eq!(
            apply_intent(&mut state, Intent::ReturnToMenu),
            Err(Rejected::MatchOver)
        );
    }

    #[test]
    fn test_lethal_self_hit_scores_opponent() {
        let mut state = open_match();
        state.actors[0].health = 30;
        let shooter = state.actors[0].position;
        shoot(
            &mut state,
            Projectile {
                pos: shooter + Vec2::new(0.0, -10.0),
                vel: Vec2::ZERO,
                owner: 0,
                time_alive: 1.0,
            },
        );
        assert_eq!(state.phase, MatchPhase::MatchOver { winner: 1 });
        assert_eq!(state.scores(), [0, 1]);
    }

    #[test]
    fn test_terrain_hit_carves_crater() {
        let mut state = open_match();
        state
            .terrain
            .buildings
            .push(Building::new(Vec2::new(300.0, 300.0), 100.0, 300.0, 4.0));
        shoot(
            &mut state,
            Projectile {
                pos: Vec2::new(350.0, 290.0),
                vel: Vec2::new(0.0, 300.0),
                owner: 0,
                time_alive: 1.0,
            },
        );
        let outcome = impacts(&mut state);
        assert!(matches!(
            outcome.as_slice(),
            [Outcome::TerrainImpact { building: 0, .. }]
        ));
        let grid = &state.terrain.buildings[0].occupancy;
        assert!(!grid.is_solid(12, 0));
        assert!(grid.is_solid(0, grid.rows - 1));
        assert!(!state.terrain.buildings[0].collapsed);
        assert_eq!(state.turn, 1);
        assert!(state.actors.iter().all(|a| a.health == 100));
    }

    #[test]
    fn test_collapse_crushes_everyone_on_the_building() {
        let mut state = open_match();
        let mut building = Building::new(Vec2::new(300.0, 500.0), 100.0, 100.0, 4.0);
        // Base band (last 5 rows) down to a sliver; one more hit brings it below 30%
        let rows = building.occupancy.rows;
        for row in rows - 5..rows {
            for col in 0..building.occupancy.cols {
                if col < 8 || col > 16 {
                    building.occupancy.clear(col, row);
                }
            }
        }
        state.terrain.buildings.push(building);
        // The shooter stands on the collapsing roof; the opponent is elsewhere
        state.actors[0].position = Vec2::new(350.0, 480.0);

        shoot(
            &mut state,
            Projectile {
                pos: Vec2::new(350.0, 590.0),
                vel: Vec2::new(0.0, 60.0),
                owner: 0,
                time_alive: 0.0,
            },
        );
        let collapse_damage = state.config.building_collapse_damage;
        assert!(state.terrain.buildings[0].collapsed);
        assert_eq!(state.actors[0].health, 100 - collapse_damage);
        assert_eq!(state.actors[1].health, 100);
        assert!(
            state
                .drain_events()
                .contains(&MatchEvent::BuildingCollapsed { building: 0 })
        );
        assert!(state.terrain.hit_test(Vec2::new(350.0, 550.0)).is_none());
    }

    #[test]
    fn test_collapse_under_opponent_costs_collapse_damage() {
        let mut state = open_match();
        let mut building = Building::new(Vec2::new(300.0, 500.0), 100.0, 100.0, 4.0);
        let rows = building.occupancy.rows;
        for row in rows - 5..rows {
            for col in 0..building.occupancy.cols {
                if col < 8 || col > 16 {
                    building.occupancy.clear(col, row);
                }
            }
        }
        state.terrain.buildings.push(building);
        // Opponent on the roof, shooter far away
        state.actors[1].position = Vec2::new(350.0, 480.0);

        shoot(
            &mut state,
            Projectile {
                pos: Vec2::new(350.0, 590.0),
                vel: Vec2::new(0.0, 60.0),
                owner: 0,
                time_alive: 0.0,
            },
        );
        let collapse_damage = state.config.building_collapse_damage;
        assert!(state.terrain.buildings[0].collapsed);
        assert_eq!(state.actors[1].health, 100 - collapse_damage);
        assert_eq!(state.actors[0].health, 100);
        assert_eq!(state.phase, MatchPhase::Aiming);
        assert_eq!(state.turn, 1);
        assert!(state.drain_events().contains(&MatchEvent::ActorDamaged {
            actor: 1,
            amount: collapse_damage,
            health: 100 - collapse_damage,
            cause: DamageCause::Collapse,
        }));
    }

    #[test]
    fn test_double_knockout_goes_to_non_shooter() {
        let mut state = open_match();
        let mut building = Building::new(Vec2::new(300.0, 500.0), 100.0, 100.0, 4.0);
        let rows = building.occupancy.rows;
        for row in rows - 5..rows {
            for col in 0..building.occupancy.cols {
                if col < 8 || col > 16 {
                    building.occupancy.clear(col, row);
                }
            }
        }
        state.terrain.buildings.push(building);
        state.actors[0].position = Vec2::new(320.0, 480.0);
        state.actors[1].position = Vec2::new(380.0, 480.0);
        state.actors[0].health = 5;
        state.actors[1].health = 5;

        shoot(
            &mut state,
            Projectile {
                pos: Vec2::new(350.0, 590.0),
                vel: Vec2::new(0.0, 60.0),
                owner: 0,
                time_alive: 0.0,
            },
        );
        assert_eq!(state.phase, MatchPhase::MatchOver { winner: 1 });
        assert_eq!(state.scores(), [0, 1]);
    }

    #[test]
    fn test_turn_alternates_over_many_shots() {
        let mut state = MatchState::new(MatchConfig::default(), names(), 777);
        let mut expected_turn = state.turn;
        for shot in 0..12 {
            if state.is_over() {
                break;
            }
            apply_intent(&mut state, Intent::AdjustPower((shot % 5) as f32 * 7.0)).unwrap();
            apply_intent(&mut state, Intent::Fire).unwrap();
            settle(&mut state);
            if !state.is_over() {
                expected_turn = 1 - expected_turn;
                assert_eq!(state.turn, expected_turn);
                assert!(state.projectile().is_none());
            }
            assert!(state.actors.iter().all(|a| a.health >= 0));
        }
    }

    #[test]
    fn test_return_to_menu_applies_pending_lethal_hit() {
        let mut state = open_match();
        state.actors[1].health = 10;
        let point = state.actors[1].position;
        state.phase = MatchPhase::Resolving(Outcome::ActorImpact { target: 1, point });

        apply_intent(&mut state, Intent::ReturnToMenu).unwrap();
        assert!(state.is_over());
        assert_eq!(state.phase, MatchPhase::MatchOver { winner: 0 });
        assert_eq!(state.scores(), [1, 0]);

        let events = state.drain_events();
        assert!(events.contains(&MatchEvent::MatchOver {
            winner: 0,
            scores: [1, 0]
        }));
        assert!(!events.contains(&MatchEvent::Suspended));
    }

    #[test]
    fn test_return_to_menu_discards_shot() {
        let mut state = open_match();
        apply_intent(&mut state, Intent::Fire).unwrap();
        tick(&mut state, SIM_DT);
        assert!(state.projectile().is_some());

        apply_intent(&mut state, Intent::ReturnToMenu).unwrap();
        assert_eq!(state.phase, MatchPhase::Aiming);
        assert_eq!(state.turn, 0, "same actor throws again on resume");
        assert!(state.drain_events().contains(&MatchEvent::Suspended));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.turn, 0);
        assert_eq!(snapshot.positions, state.actor_positions());
    }

    #[test]
    fn test_explosions_expire() {
        let mut state = open_match();
        let target = state.actors[1].position;
        shoot(
            &mut state,
            Projectile {
                pos: target - Vec2::new(40.0, 0.0),
                vel: Vec2::new(600.0, 0.0),
                owner: 0,
                time_alive: 1.0,
            },
        );
        assert_eq!(state.explosions.len(), 1);
        let ticks = (state.config.explosion_duration / SIM_DT).ceil() as usize + 1;
        for _ in 0..ticks {
            tick(&mut state, SIM_DT);
        }
        assert!(state.explosions.is_empty());
    }
}
