use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CombatError, Result};
use crate::unit::{UnitId, UnitRecord};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    #[default]
    Bench,
    BoardIdle,
    Combat,
    /// Terminal. Kept only for post-mortem queries.
    Removed,
}

impl UnitState {
    pub const ALL: [UnitState; 4] = [
        UnitState::Bench,
        UnitState::BoardIdle,
        UnitState::Combat,
        UnitState::Removed,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Place,
    Unplace,
    CombatStart,
    CombatEnd,
    Death,
}

impl Trigger {
    pub const ALL: [Trigger; 5] = [
        Trigger::Place,
        Trigger::Unplace,
        Trigger::CombatStart,
        Trigger::CombatEnd,
        Trigger::Death,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub unit: UnitId,
    pub from: UnitState,
    pub to: UnitState,
    pub trigger: Trigger,
}

/// Sole owner of `UnitRecord::state` changes.
pub struct CombatStateMachine;

impl CombatStateMachine {
    /// The legal edge set. `None` means the request is rejected.
    pub fn next(from: UnitState, trigger: Trigger) -> Option<UnitState> {
        match (from, trigger) {
            (UnitState::Bench, Trigger::Place) => Some(UnitState::BoardIdle),
            (UnitState::BoardIdle, Trigger::Unplace) => Some(UnitState::Bench),
            (UnitState::BoardIdle, Trigger::CombatStart) => Some(UnitState::Combat),
            (UnitState::Combat, Trigger::CombatEnd) => Some(UnitState::BoardIdle),
            (UnitState::Combat, Trigger::Death) => Some(UnitState::Removed),
            _ => None,
        }
    }

    pub fn apply(unit: &mut UnitRecord, trigger: Trigger) -> Result<Transition> {
        let from = unit.state();
        let to = Self::next(from, trigger).ok_or(CombatError::InvalidTransition {
            unit: unit.id(),
            from,
            trigger,
        })?;
        unit.enter_state(to);
        info!(
            target: "combat_core.state",
            unit = %unit.id(),
            name = %unit.name(),
            ?from,
            ?to,
            ?trigger,
            "state changed"
        );
        Ok(Transition {
            unit: unit.id(),
            from,
            to,
            trigger,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::team::Team;
    use crate::unit::{UnitStats, UnitTemplate};

    fn benched() -> UnitRecord {
        UnitRecord::new(
            UnitId(7),
            UnitTemplate::new("Archer", Team::Player, UnitStats::default()),
        )
    }

    fn unit_in(state: UnitState) -> UnitRecord {
        let mut unit = benched();
        unit.enter_state(state);
        unit
    }

    #[test]
    fn bench_cannot_jump_to_combat() {
        let mut unit = benched();
        let err = CombatStateMachine::apply(&mut unit, Trigger::CombatStart).unwrap_err();
        assert_eq!(
            err,
            CombatError::InvalidTransition {
                unit: UnitId(7),
                from: UnitState::Bench,
                trigger: Trigger::CombatStart,
            }
        );
        assert_eq!(unit.state(), UnitState::Bench);
    }

    #[test]
    fn full_round_trip() {
        let mut unit = benched();
        for (trigger, expected) in [
            (Trigger::Place, UnitState::BoardIdle),
            (Trigger::CombatStart, UnitState::Combat),
            (Trigger::CombatEnd, UnitState::BoardIdle),
            (Trigger::Unplace, UnitState::Bench),
        ] {
            let transition = CombatStateMachine::apply(&mut unit, trigger).unwrap();
            assert_eq!(transition.to, expected);
            assert_eq!(unit.state(), expected);
        }
    }

    #[test]
    fn removed_is_terminal() {
        for trigger in Trigger::ALL {
            assert_eq!(CombatStateMachine::next(UnitState::Removed, trigger), None);
        }
    }

    #[test]
    fn leaving_combat_for_bench_clears_target() {
        let mut unit = unit_in(UnitState::BoardIdle);
        unit.set_target(Some(UnitId(3)));
        CombatStateMachine::apply(&mut unit, Trigger::Unplace).unwrap();
        assert_eq!(unit.target(), None);
    }

    fn any_state() -> impl Strategy<Value = UnitState> {
        proptest::sample::select(UnitState::ALL.to_vec())
    }

    fn any_trigger() -> impl Strategy<Value = Trigger> {
        proptest::sample::select(Trigger::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn transitions_follow_the_edge_set(from in any_state(), trigger in any_trigger()) {
            let mut unit = unit_in(from);
            match (CombatStateMachine::next(from, trigger), CombatStateMachine::apply(&mut unit, trigger)) {
                (Some(to), Ok(transition)) => {
                    prop_assert_eq!(transition.from, from);
                    prop_assert_eq!(transition.to, to);
                    prop_assert_eq!(unit.state(), to);
                }
                (None, Err(CombatError::InvalidTransition { .. })) => {
                    prop_assert_eq!(unit.state(), from);
                }
                (expected, actual) => {
                    prop_assert!(false, "expected {:?}, got {:?}", expected, actual);
                }
            }
        }
    }
}
