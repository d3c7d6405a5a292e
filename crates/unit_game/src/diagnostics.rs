use bevy::diagnostic::LogDiagnosticsPlugin;
use bevy::prelude::*;
use combat_core::CombatEvent;
use tracing::{debug, info};

use crate::gameplay::MatchRoster;

pub struct DiagnosticsPlugin;

impl Plugin for DiagnosticsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(LogDiagnosticsPlugin::default())
            .add_event::<RosterEvent>()
            .add_systems(PostUpdate, forward_roster_events);
    }
}

/// A roster event re-published on the Bevy event bus.
#[derive(Event, Clone, Debug, PartialEq)]
pub struct RosterEvent(pub CombatEvent);

fn forward_roster_events(
    roster: Option<ResMut<MatchRoster>>,
    mut writer: EventWriter<RosterEvent>,
) {
    let Some(mut roster) = roster else {
        return;
    };
    for event in roster.drain_events() {
        match &event {
            CombatEvent::Died {
                unit,
                name,
                killer,
                at,
            } => {
                info!(target: "unit_game.combat", %unit, %name, ?killer, at = *at, "unit died");
            }
            CombatEvent::AbilityCast { unit } => {
                info!(target: "unit_game.combat", %unit, "ability cast");
            }
            other => debug!(target: "unit_game.combat", event = ?other),
        }
        writer.send(RosterEvent(event));
    }
}
