//! Per-frame auto-attack loop for units in combat.

use tracing::{debug, info};

use crate::damage::DamageEvent;
use crate::events::CombatEvent;
use crate::roster::Roster;
use crate::state::UnitState;
use crate::team::Team;
use crate::unit::{BoardPosition, UnitId};

#[derive(Clone, Copy, Debug)]
struct Fighter {
    id: UnitId,
    team: Team,
    position: BoardPosition,
}

/// Nearest hostile fighter; ties go to the lower id.
fn nearest_hostile(fighters: &[Fighter], me: &Fighter) -> Option<Fighter> {
    fighters
        .iter()
        .filter(|other| other.id != me.id && me.team.is_hostile_to(other.team))
        .min_by(|a, b| {
            me.position
                .distance_to(a.position)
                .total_cmp(&me.position.distance_to(b.position))
                .then(a.id.cmp(&b.id))
        })
        .copied()
}

impl Roster {
    /// Every fighter acts once against the same snapshot; the resulting hits
    /// are queued and land together when the mailbox is flushed.
    pub(crate) fn drive_combat(&mut self, delta_seconds: f32) {
        let mut fighters: Vec<Fighter> = self
            .units
            .values()
            .filter(|u| u.state() == UnitState::Combat && u.is_alive())
            .map(|u| Fighter {
                id: u.id(),
                team: u.team(),
                position: u.position(),
            })
            .collect();

        for idx in 0..fighters.len() {
            let me = fighters[idx];
            let Some(unit) = self.units.get_mut(&me.id) else {
                continue;
            };
            if unit.is_casting() {
                continue;
            }
            if unit.mana_full() {
                unit.begin_cast(self.rules.cast_duration);
                info!(target: "combat_core.combat", unit = %me.id, "casting ability");
                self.events.push(CombatEvent::AbilityCast { unit: me.id });
                continue;
            }

            let current = unit.target().and_then(|target| {
                fighters
                    .iter()
                    .find(|f| f.id == target && me.team.is_hostile_to(f.team))
                    .copied()
            });
            let Some(target) = current.or_else(|| nearest_hostile(&fighters, &me)) else {
                unit.set_target(None);
                continue;
            };
            if unit.target() != Some(target.id) {
                debug!(target: "combat_core.combat", unit = %me.id, target = %target.id, "new target");
                unit.set_target(Some(target.id));
            }

            let range = unit.stats().attack_range;
            if me.position.distance_to(target.position) > range {
                let step = unit.stats().move_speed * delta_seconds;
                let moved = me.position.step_toward(target.position, step, range);
                unit.set_position(moved);
                fighters[idx].position = moved;
                continue;
            }

            if unit.attack_cooldown() > 0.0 {
                continue;
            }
            let damage = unit.stats().attack_damage;
            unit.gain_mana(self.rules.mana_per_attack);
            unit.start_attack_cooldown();
            self.submit(target.id, DamageEvent::physical(damage).with_source(me.id));
            self.events.push(CombatEvent::Attacked {
                attacker: me.id,
                target: target.id,
            });
        }
    }
}
