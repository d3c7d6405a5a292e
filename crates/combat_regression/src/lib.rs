//! Helpers for deterministic regression tests.

use combat_core::{
    BoardPosition, CombatEvent, MatchOutcome, Roster, Team, UnitStats, UnitTemplate,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

pub const DEFAULT_SEED: u64 = 42;

/// Two facing rows of `squad_size` units with seeded health and damage
/// rolls, already activated and placed.
pub fn seeded_lineup(seed: u64, squad_size: usize) -> combat_core::Result<Roster> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut roster = Roster::default();
    for (team, row_y) in [(Team::Player, 0.0), (Team::Enemy, 300.0)] {
        for slot in 0..squad_size {
            let health = rng.gen_range(80..=120) as f32;
            let damage = rng.gen_range(8..=14) as f32;
            let stats = UnitStats::default()
                .with_max_health(health)
                .with_attack(damage, 1.0, 150.0);
            let name = format!("{} {}", team.label(), slot + 1);
            let id = roster.spawn(UnitTemplate::new(name, team, stats))?;
            roster.begin_play(id)?;
            roster.place(id, BoardPosition::new(slot as f32 * 150.0, row_y))?;
        }
    }
    Ok(roster)
}

/// One line per event, with integers only so snapshots stay stable.
pub fn describe(event: &CombatEvent) -> String {
    match event {
        CombatEvent::StateChanged {
            unit,
            from,
            to,
            trigger,
        } => format!("{unit} {from:?} -> {to:?} on {trigger:?}"),
        CombatEvent::Attacked { attacker, target } => format!("{attacker} attacks {target}"),
        CombatEvent::Damaged {
            unit,
            source,
            kind,
            amount,
            health,
        } => format!(
            "{unit} takes {amount:.0} {kind:?} from {} ({health:.0} left)",
            source.map(|s| s.to_string()).unwrap_or_else(|| "?".into())
        ),
        CombatEvent::Died {
            unit, name, killer, ..
        } => format!(
            "{unit} {name} dies, killer {}",
            killer.map(|k| k.to_string()).unwrap_or_else(|| "?".into())
        ),
        CombatEvent::AbilityCast { unit } => format!("{unit} casts"),
        CombatEvent::Hidden { unit } => format!("{unit} hidden"),
        CombatEvent::Collected { unit } => format!("{unit} collected"),
        CombatEvent::Revived { unit } => format!("{unit} revived"),
    }
}

/// Starts combat and records every event, stamped with the tick it landed on,
/// until the fight is decided or `max_ticks` have run.
pub fn traced_combat(roster: &mut Roster, tick_seconds: f32, max_ticks: u32) -> Vec<String> {
    roster.start_combat();
    roster.drain_events();
    let mut lines = Vec::new();
    for _ in 0..max_ticks {
        roster.tick(tick_seconds);
        let at = roster.elapsed();
        lines.extend(
            roster
                .drain_events()
                .iter()
                .map(|event| format!("{at:.2}s {}", describe(event))),
        );
        if roster.outcome() != MatchOutcome::Ongoing {
            break;
        }
    }
    lines
}

/// Compact health table for determinism checks.
pub fn health_table(roster: &Roster) -> serde_json::Value {
    let units: Vec<_> = roster
        .units()
        .map(|u| {
            json!({
                "id": u.id().0,
                "team": u.team().label(),
                "health": u.current_health().round() as i64,
            })
        })
        .collect();
    json!({ "units": units, "outcome": format!("{:?}", roster.outcome()) })
}
