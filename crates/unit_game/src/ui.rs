use bevy::prelude::*;
use combat_core::{CombatEvent, Team, UnitState};

use crate::diagnostics::RosterEvent;
use crate::gameplay::{MatchParams, MatchPhase, MatchRoster};

const KILL_FEED_LEN: usize = 4;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb_u8(5, 6, 16)))
            .init_resource::<KillFeed>()
            .add_event::<RosterEvent>()
            .add_systems(Startup, spawn_debug_hud)
            .add_systems(Update, (record_kills, update_debug_hud.after(record_kills)));
    }
}

#[derive(Component)]
struct DebugHud;

#[derive(Resource, Default)]
struct KillFeed {
    lines: Vec<String>,
}

fn spawn_debug_hud(mut commands: Commands) {
    commands.spawn(Camera2d);

    commands.spawn((
        Text::new("Loading roster…"),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::srgb(0.86, 0.93, 1.0)),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(16.0),
            left: Val::Px(16.0),
            ..default()
        },
        DebugHud,
    ));
}

fn record_kills(mut events: EventReader<RosterEvent>, mut feed: ResMut<KillFeed>) {
    for RosterEvent(event) in events.read() {
        if let CombatEvent::Died { name, killer, at, .. } = event {
            let killer = killer.map(|k| k.to_string()).unwrap_or_else(|| "?".into());
            feed.lines.push(format!("{at:>6.2}s  {name} fell to {killer}"));
        }
    }
    let overflow = feed.lines.len().saturating_sub(KILL_FEED_LEN);
    feed.lines.drain(..overflow);
}

fn update_debug_hud(
    mut text: Query<&mut Text, With<DebugHud>>,
    params: Option<Res<MatchParams>>,
    phase: Option<Res<MatchPhase>>,
    roster: Option<Res<MatchRoster>>,
    feed: Res<KillFeed>,
) {
    let Ok(mut text) = text.get_single_mut() else {
        return;
    };
    let (seed, fixed_dt) = params
        .map(|p| (p.seed, p.fixed_delta))
        .unwrap_or((0, 1.0 / 30.0));
    let phase = phase.map(|p| *p).unwrap_or_default();
    let mut content = format!("Tactics Board\nseed: {seed}\nfixed Δt: {fixed_dt:.4}s\nphase: {phase:?}\n");
    if let Some(roster) = roster {
        for team in [Team::Player, Team::Enemy, Team::Neutral] {
            let alive = roster
                .units()
                .filter(|u| u.team() == team && u.is_alive() && u.state() != UnitState::Bench)
                .count();
            content.push_str(&format!("{}: {alive} on board\n", team.label()));
        }
    }
    content.push_str("[space] fight  [r] reset\n");
    for line in &feed.lines {
        content.push_str(line);
        content.push('\n');
    }
    content.clone_into(&mut **text);
}
