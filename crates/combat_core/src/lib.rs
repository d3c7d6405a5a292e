//! Engine-independent unit combat core for a tactics auto-battler.
//!
//! A [`Roster`] owns every [`UnitRecord`]. State changes go through the
//! [`CombatStateMachine`], health changes through the [`DamageResolver`].

pub mod combat;
pub mod config;
pub mod damage;
pub mod error;
pub mod events;
pub mod mitigation;
pub mod report;
pub mod resolver;
pub mod roster;
pub mod simulation;
pub mod state;
pub mod team;
pub mod unit;

pub use config::{CombatRules, MitigationPolicy, ScenarioConfig, UnitConfig};
pub use damage::{DamageEvent, DamageKind, PendingDamage};
pub use error::{CombatError, Result, ScenarioError};
pub use events::CombatEvent;
pub use mitigation::{FlatPercentMitigation, Mitigation, NoMitigation, ResistanceMitigation};
pub use report::{DeathRecord, MatchReport, MatchSummary, UnitSummary};
pub use resolver::{DamageResolver, Outcome, Resolution};
pub use roster::{MatchOutcome, Roster};
pub use simulation::{run_combat, SimulationRun, SimulationSettings};
pub use state::{CombatStateMachine, Transition, Trigger, UnitState};
pub use team::Team;
pub use unit::{BoardPosition, UnitId, UnitRecord, UnitStats, UnitTemplate};
