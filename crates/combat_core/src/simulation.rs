use tracing::{info, warn};

use crate::error::ScenarioError;
use crate::events::CombatEvent;
use crate::roster::{MatchOutcome, Roster};

pub const DEFAULT_TICK_SECONDS: f32 = 1.0 / 30.0;
pub const DEFAULT_TIME_LIMIT: f32 = 90.0;

/// Headless fixed-step driver used by the CLI and regression tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationSettings {
    pub tick_seconds: f32,
    pub time_limit: f32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_seconds: DEFAULT_TICK_SECONDS,
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !self.tick_seconds.is_finite() || self.tick_seconds <= 0.0 {
            return Err(ScenarioError::Invalid(format!(
                "tick must be a positive number of seconds, got {}",
                self.tick_seconds
            )));
        }
        if !self.time_limit.is_finite() || self.time_limit < 0.0 {
            return Err(ScenarioError::Invalid(format!(
                "time limit must be a non-negative number of seconds, got {}",
                self.time_limit
            )));
        }
        Ok(())
    }

    fn max_ticks(&self) -> u32 {
        (self.time_limit / self.tick_seconds).ceil() as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationRun {
    pub outcome: MatchOutcome,
    pub ticks: u32,
    pub elapsed: f32,
    pub timed_out: bool,
    pub events: Vec<CombatEvent>,
}

/// Starts combat and ticks until one side is wiped out or time runs out.
/// Settings that fail [`SimulationSettings::validate`] run no ticks.
pub fn run_combat(roster: &mut Roster, settings: SimulationSettings) -> SimulationRun {
    roster.start_combat();
    let max_ticks = match settings.validate() {
        Ok(()) => settings.max_ticks(),
        Err(err) => {
            warn!(target: "combat_core.simulation", %err, "invalid settings, not ticking");
            0
        }
    };
    let mut ticks = 0;
    while ticks < max_ticks && roster.outcome() == MatchOutcome::Ongoing {
        roster.tick(settings.tick_seconds);
        ticks += 1;
    }
    let outcome = roster.outcome();
    let timed_out = outcome == MatchOutcome::Ongoing;
    info!(
        target: "combat_core.simulation",
        ?outcome,
        ticks,
        elapsed = roster.elapsed(),
        timed_out,
        "combat finished"
    );
    SimulationRun {
        outcome,
        ticks,
        elapsed: roster.elapsed(),
        timed_out,
        events: roster.drain_events(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;
    use crate::unit::{BoardPosition, UnitStats, UnitTemplate};

    #[test]
    fn lopsided_fight_ends_in_victory() {
        let mut roster = Roster::default();
        let titan = roster
            .spawn(UnitTemplate::new(
                "Titan",
                Team::Enemy,
                UnitStats::default().with_attack(200.0, 2.0, 150.0),
            ))
            .unwrap();
        let squire = roster
            .spawn(UnitTemplate::new("Squire", Team::Player, UnitStats::default()))
            .unwrap();
        roster.place(titan, BoardPosition::new(0.0, 400.0)).unwrap();
        roster.place(squire, BoardPosition::new(0.0, 0.0)).unwrap();

        let run = run_combat(&mut roster, SimulationSettings::default());
        assert_eq!(run.outcome, MatchOutcome::Victory { team: Team::Enemy });
        assert!(!run.timed_out);
        assert!(run
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::Died { unit, .. } if *unit == squire)));
    }

    #[test]
    fn stalemates_time_out() {
        let mut roster = Roster::default();
        for (name, team, y) in [("Pacifist", Team::Player, 0.0), ("Monk", Team::Enemy, 50.0)] {
            let id = roster
                .spawn(UnitTemplate::new(
                    name,
                    team,
                    UnitStats::default().with_attack(0.0, 1.0, 150.0),
                ))
                .unwrap();
            roster.place(id, BoardPosition::new(0.0, y)).unwrap();
        }
        let run = run_combat(
            &mut roster,
            SimulationSettings {
                tick_seconds: 0.5,
                time_limit: 5.0,
            },
        );
        assert!(run.timed_out);
        assert_eq!(run.ticks, 10);
        assert_eq!(run.outcome, MatchOutcome::Ongoing);
    }

    #[test]
    fn settings_reject_unbounded_or_negative_limits() {
        for time_limit in [f32::INFINITY, f32::NAN, -1.0] {
            let settings = SimulationSettings {
                time_limit,
                ..SimulationSettings::default()
            };
            assert!(matches!(settings.validate(), Err(ScenarioError::Invalid(_))));
        }
        for tick_seconds in [0.0, -0.1, f32::INFINITY] {
            let settings = SimulationSettings {
                tick_seconds,
                ..SimulationSettings::default()
            };
            assert!(settings.validate().is_err());
        }
        assert!(SimulationSettings::default().validate().is_ok());
        let zero = SimulationSettings {
            time_limit: 0.0,
            ..SimulationSettings::default()
        };
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn infinite_limit_runs_no_ticks() {
        let mut roster = Roster::default();
        for (name, team, y) in [("Knight", Team::Player, 0.0), ("Goblin", Team::Enemy, 50.0)] {
            let id = roster
                .spawn(UnitTemplate::new(name, team, UnitStats::default()))
                .unwrap();
            roster.place(id, BoardPosition::new(0.0, y)).unwrap();
        }
        let run = run_combat(
            &mut roster,
            SimulationSettings {
                tick_seconds: 0.1,
                time_limit: f32::INFINITY,
            },
        );
        assert_eq!(run.ticks, 0);
        assert!(run.timed_out);
    }
}
