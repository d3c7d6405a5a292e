use std::path::PathBuf;

use thiserror::Error;

use crate::state::{Trigger, UnitState};
use crate::unit::UnitId;

/// Local validation failures. The unit's state and health are untouched
/// whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CombatError {
    #[error("unit {unit} cannot take {trigger:?} while {from:?}")]
    InvalidTransition {
        unit: UnitId,
        from: UnitState,
        trigger: Trigger,
    },

    #[error("unit {unit} is {state:?} and cannot be damaged outside combat")]
    OutOfCombat { unit: UnitId, state: UnitState },

    #[error("damage amount {amount} is not a finite non-negative number")]
    InvalidDamage { amount: f32 },

    #[error("stat `{field}` has invalid value {value}")]
    InvalidStats { field: &'static str, value: f32 },

    #[error("unit {unit} is {state:?}; only removed units return to the pool")]
    NotRemoved { unit: UnitId, state: UnitState },

    #[error("unit {0} is not in the roster")]
    UnknownUnit(UnitId),
}

pub type Result<T> = std::result::Result<T, CombatError>;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid scenario: {0}")]
    Invalid(String),

    #[error(transparent)]
    Combat(#[from] CombatError),
}
