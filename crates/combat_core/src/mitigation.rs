//! Injectable damage mitigation strategies.
//!
//! The resolver only consults a strategy for mitigable damage kinds; true
//! damage never reaches it.

use crate::damage::DamageKind;
use crate::unit::UnitRecord;

pub trait Mitigation: Send + Sync {
    fn name(&self) -> &'static str;

    /// Damage left after `target`'s defenses. The resolver clamps the result
    /// to `[0, amount]`.
    fn mitigate(&self, target: &UnitRecord, amount: f32, kind: DamageKind) -> f32;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoMitigation;

impl Mitigation for NoMitigation {
    fn name(&self) -> &'static str {
        "none"
    }

    fn mitigate(&self, _target: &UnitRecord, amount: f32, _kind: DamageKind) -> f32 {
        amount
    }
}

/// `amount * 100 / (100 + resist)`, with armor for physical and magic resist
/// for magical damage. Negative resistances count as zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResistanceMitigation;

impl ResistanceMitigation {
    pub fn multiplier(resist: f32) -> f32 {
        100.0 / (100.0 + resist.max(0.0))
    }
}

impl Mitigation for ResistanceMitigation {
    fn name(&self) -> &'static str {
        "resistance"
    }

    fn mitigate(&self, target: &UnitRecord, amount: f32, kind: DamageKind) -> f32 {
        let stats = target.stats();
        match kind {
            DamageKind::Physical => amount * Self::multiplier(stats.armor),
            DamageKind::Magical => amount * Self::multiplier(stats.magic_resist),
            DamageKind::TrueDamage => amount,
        }
    }
}

/// Fixed fractional reduction per kind, independent of unit stats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatPercentMitigation {
    pub physical: f32,
    pub magical: f32,
}

impl Mitigation for FlatPercentMitigation {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn mitigate(&self, _target: &UnitRecord, amount: f32, kind: DamageKind) -> f32 {
        let reduction = match kind {
            DamageKind::Physical => self.physical,
            DamageKind::Magical => self.magical,
            DamageKind::TrueDamage => 0.0,
        };
        amount * (1.0 - reduction.clamp(0.0, 1.0))
    }
}
