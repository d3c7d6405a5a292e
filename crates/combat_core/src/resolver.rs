use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::damage::DamageEvent;
use crate::error::{CombatError, Result};
use crate::mitigation::{Mitigation, ResistanceMitigation};
use crate::state::{CombatStateMachine, Transition, Trigger, UnitState};
use crate::unit::UnitRecord;

pub const DEFAULT_MANA_PER_HIT: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Alive,
    Dead,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Resolution {
    pub previous_health: f32,
    pub new_health: f32,
    pub mitigated_amount: f32,
    pub outcome: Outcome,
    /// Set when the hit was lethal.
    pub transition: Option<Transition>,
}

/// The only writer of `UnitRecord::current_health` during combat.
pub struct DamageResolver {
    mitigation: Box<dyn Mitigation>,
    mana_per_hit: f32,
}

impl Default for DamageResolver {
    fn default() -> Self {
        Self::new(ResistanceMitigation)
    }
}

impl fmt::Debug for DamageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DamageResolver")
            .field("mitigation", &self.mitigation.name())
            .field("mana_per_hit", &self.mana_per_hit)
            .finish()
    }
}

impl DamageResolver {
    pub fn new(mitigation: impl Mitigation + 'static) -> Self {
        Self::from_boxed(Box::new(mitigation))
    }

    pub fn from_boxed(mitigation: Box<dyn Mitigation>) -> Self {
        Self {
            mitigation,
            mana_per_hit: DEFAULT_MANA_PER_HIT,
        }
    }

    pub fn with_mana_per_hit(mut self, mana_per_hit: f32) -> Self {
        self.mana_per_hit = mana_per_hit;
        self
    }

    pub fn mitigation(&self) -> &dyn Mitigation {
        self.mitigation.as_ref()
    }

    /// Damage that would land on `unit`, in `[0, event.amount]`.
    pub fn mitigated_amount(&self, unit: &UnitRecord, event: &DamageEvent) -> f32 {
        if !event.kind.is_mitigated() {
            return event.amount;
        }
        let mitigated = self.mitigation.mitigate(unit, event.amount, event.kind);
        if mitigated.is_finite() {
            mitigated.clamp(0.0, event.amount)
        } else {
            event.amount
        }
    }

    pub fn resolve(&self, unit: &mut UnitRecord, event: &DamageEvent) -> Result<Resolution> {
        if unit.state() != UnitState::Combat {
            return Err(CombatError::OutOfCombat {
                unit: unit.id(),
                state: unit.state(),
            });
        }
        if !event.amount.is_finite() || event.amount < 0.0 {
            return Err(CombatError::InvalidDamage {
                amount: event.amount,
            });
        }

        let previous_health = unit.current_health();
        if event.amount == 0.0 {
            return Ok(Resolution {
                previous_health,
                new_health: previous_health,
                mitigated_amount: 0.0,
                outcome: Outcome::Alive,
                transition: None,
            });
        }

        let mitigated_amount = self.mitigated_amount(unit, event);
        let new_health = (previous_health - mitigated_amount).max(0.0);
        unit.set_current_health(new_health);
        if mitigated_amount > 0.0 {
            unit.gain_mana(self.mana_per_hit);
        }
        debug!(
            target: "combat_core.resolver",
            unit = %unit.id(),
            kind = ?event.kind,
            raw = event.amount,
            mitigated = mitigated_amount,
            health = new_health,
            max = unit.max_health(),
            "damage applied"
        );

        if new_health > 0.0 {
            return Ok(Resolution {
                previous_health,
                new_health,
                mitigated_amount,
                outcome: Outcome::Alive,
                transition: None,
            });
        }

        unit.record_killer(event.source);
        let transition = CombatStateMachine::apply(unit, Trigger::Death)?;
        info!(
            target: "combat_core.resolver",
            unit = %unit.id(),
            name = %unit.name(),
            killer = ?event.source,
            "unit died"
        );
        Ok(Resolution {
            previous_health,
            new_health,
            mitigated_amount,
            outcome: Outcome::Dead,
            transition: Some(transition),
        })
    }
}
