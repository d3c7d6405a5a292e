//! Bevy host for the combat core. Entities carry a [`gameplay::UnitActor`]
//! handle; every gameplay rule lives in the [`combat_core::Roster`] resource.

use bevy::prelude::*;

pub mod diagnostics;
pub mod gameplay;
pub mod ui;

pub use gameplay::{MatchPhase, MatchRoster, PhaseRequest, UnitActor};

/// Gameplay systems plus combat logging. The HUD is added separately by
/// windowed runners.
pub struct UnitGamePlugin;

impl Plugin for UnitGamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((gameplay::GameplayPlugin, diagnostics::DiagnosticsPlugin));
    }
}
