use serde::{Deserialize, Serialize};

use crate::unit::UnitId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    #[default]
    Physical,
    Magical,
    /// Ignores every mitigation strategy.
    TrueDamage,
}

impl DamageKind {
    pub fn is_mitigated(self) -> bool {
        !matches!(self, DamageKind::TrueDamage)
    }
}

/// Ephemeral damage payload; consumed by the resolver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub amount: f32,
    pub kind: DamageKind,
    /// Looked up in the roster when resolved; may already be gone.
    pub source: Option<UnitId>,
}

impl DamageEvent {
    pub fn new(amount: f32, kind: DamageKind) -> Self {
        Self {
            amount,
            kind,
            source: None,
        }
    }

    pub fn physical(amount: f32) -> Self {
        Self::new(amount, DamageKind::Physical)
    }

    pub fn magical(amount: f32) -> Self {
        Self::new(amount, DamageKind::Magical)
    }

    pub fn true_damage(amount: f32) -> Self {
        Self::new(amount, DamageKind::TrueDamage)
    }

    pub fn with_source(mut self, source: UnitId) -> Self {
        self.source = Some(source);
        self
    }
}

/// A damage event waiting in the roster mailbox.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingDamage {
    pub target: UnitId,
    pub event: DamageEvent,
}
