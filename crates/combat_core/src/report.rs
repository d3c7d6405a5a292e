use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::CombatEvent;
use crate::roster::{MatchOutcome, Roster};
use crate::simulation::SimulationRun;
use crate::state::UnitState;
use crate::team::Team;
use crate::unit::UnitId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub scenario: Option<String>,
    pub summary: MatchSummary,
    pub survivors: Vec<UnitSummary>,
    pub deaths: Vec<DeathRecord>,
}

impl MatchReport {
    pub fn new(
        id: impl Into<String>,
        scenario: Option<String>,
        roster: &Roster,
        run: &SimulationRun,
    ) -> Self {
        // Benched units sat the fight out.
        let survivors = roster
            .units()
            .filter(|u| {
                u.is_alive() && matches!(u.state(), UnitState::Combat | UnitState::BoardIdle)
            })
            .map(|u| UnitSummary {
                id: u.id(),
                name: u.name().to_owned(),
                team: u.team(),
                health: u.current_health(),
                max_health: u.max_health(),
            })
            .collect();
        Self {
            id: id.into(),
            timestamp: Utc::now().to_rfc3339(),
            scenario,
            summary: MatchSummary {
                outcome: run.outcome,
                ticks: run.ticks,
                elapsed_seconds: run.elapsed,
                timed_out: run.timed_out,
                events: run.events.len(),
            },
            survivors,
            deaths: collect_deaths(&run.events),
        }
    }
}

fn collect_deaths(events: &[CombatEvent]) -> Vec<DeathRecord> {
    events
        .iter()
        .filter_map(|event| match event {
            CombatEvent::Died {
                unit,
                name,
                killer,
                at,
            } => Some(DeathRecord {
                unit: *unit,
                name: name.clone(),
                killer: *killer,
                at_seconds: *at,
            }),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub outcome: MatchOutcome,
    pub ticks: u32,
    pub elapsed_seconds: f32,
    pub timed_out: bool,
    pub events: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSummary {
    pub id: UnitId,
    pub name: String,
    pub team: Team,
    pub health: f32,
    pub max_health: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathRecord {
    pub unit: UnitId,
    pub name: String,
    pub killer: Option<UnitId>,
    pub at_seconds: f32,
}
