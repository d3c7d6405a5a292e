use serde::Serialize;

use crate::damage::DamageKind;
use crate::state::{Trigger, UnitState};
use crate::unit::UnitId;

/// Everything observable that happened in a match, in order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    StateChanged {
        unit: UnitId,
        from: UnitState,
        to: UnitState,
        trigger: Trigger,
    },
    Attacked {
        attacker: UnitId,
        target: UnitId,
    },
    Damaged {
        unit: UnitId,
        source: Option<UnitId>,
        kind: DamageKind,
        amount: f32,
        health: f32,
    },
    Died {
        unit: UnitId,
        name: String,
        killer: Option<UnitId>,
        at: f32,
    },
    AbilityCast {
        unit: UnitId,
    },
    /// A fallen player unit left the board view; it returns next round.
    Hidden {
        unit: UnitId,
    },
    Collected {
        unit: UnitId,
    },
    Revived {
        unit: UnitId,
    },
}

impl CombatEvent {
    pub fn unit(&self) -> UnitId {
        match self {
            CombatEvent::StateChanged { unit, .. }
            | CombatEvent::Damaged { unit, .. }
            | CombatEvent::Died { unit, .. }
            | CombatEvent::AbilityCast { unit }
            | CombatEvent::Hidden { unit }
            | CombatEvent::Collected { unit }
            | CombatEvent::Revived { unit } => *unit,
            CombatEvent::Attacked { attacker, .. } => *attacker,
        }
    }
}
