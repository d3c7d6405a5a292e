//! Match/session context that owns every unit record.
//!
//! All mutation goes through `&mut Roster`, so a unit never sees two damage
//! events interleave. Producers that cannot resolve immediately queue into the
//! mailbox, which is drained in FIFO order once per tick.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CombatRules;
use crate::damage::{DamageEvent, PendingDamage};
use crate::error::{CombatError, Result};
use crate::events::CombatEvent;
use crate::mitigation::Mitigation;
use crate::resolver::{DamageResolver, Outcome, Resolution};
use crate::state::{CombatStateMachine, Transition, Trigger, UnitState};
use crate::team::Team;
use crate::unit::{BoardPosition, UnitId, UnitRecord, UnitTemplate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MatchOutcome {
    /// Both sides still have units in combat.
    Ongoing,
    Victory { team: Team },
    Draw,
}

#[derive(Debug, Clone, Copy)]
struct Corpse {
    id: UnitId,
    remaining: f32,
}

#[derive(Debug)]
pub struct Roster {
    pub(crate) units: BTreeMap<UnitId, UnitRecord>,
    next_id: u32,
    pub(crate) rules: CombatRules,
    resolver: DamageResolver,
    mailbox: VecDeque<PendingDamage>,
    corpses: Vec<Corpse>,
    pub(crate) events: Vec<CombatEvent>,
    elapsed: f32,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(CombatRules::default())
    }
}

impl Roster {
    pub fn new(rules: CombatRules) -> Self {
        let resolver =
            DamageResolver::from_boxed(rules.mitigation.build()).with_mana_per_hit(rules.mana_per_hit);
        Self {
            units: BTreeMap::new(),
            next_id: 1,
            rules,
            resolver,
            mailbox: VecDeque::new(),
            corpses: Vec::new(),
            events: Vec::new(),
            elapsed: 0.0,
        }
    }

    /// Replaces the mitigation strategy chosen by the rules.
    pub fn with_mitigation(mut self, mitigation: impl Mitigation + 'static) -> Self {
        self.resolver = DamageResolver::new(mitigation).with_mana_per_hit(self.rules.mana_per_hit);
        self
    }

    pub fn rules(&self) -> &CombatRules {
        &self.rules
    }

    pub fn resolver(&self) -> &DamageResolver {
        &self.resolver
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: UnitId) -> Option<&UnitRecord> {
        self.units.get(&id)
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Units in id (spawn) order.
    pub fn units(&self) -> impl Iterator<Item = &UnitRecord> {
        self.units.values()
    }

    pub(crate) fn record_mut(&mut self, id: UnitId) -> Result<&mut UnitRecord> {
        self.units.get_mut(&id).ok_or(CombatError::UnknownUnit(id))
    }

    /// Adds a benched unit. Hosts call [`Roster::begin_play`] once the
    /// engine-side actor is activated.
    pub fn spawn(&mut self, template: UnitTemplate) -> Result<UnitId> {
        template.stats.validate()?;
        let id = UnitId(self.next_id);
        self.next_id += 1;
        self.units.insert(id, UnitRecord::new(id, template));
        Ok(id)
    }

    pub fn begin_play(&mut self, id: UnitId) -> Result<()> {
        self.record_mut(id)?.on_begin_play();
        Ok(())
    }

    pub fn transition(&mut self, id: UnitId, trigger: Trigger) -> Result<Transition> {
        let transition = CombatStateMachine::apply(self.record_mut(id)?, trigger)?;
        self.push_transition(transition);
        Ok(transition)
    }

    pub fn place(&mut self, id: UnitId, position: BoardPosition) -> Result<Transition> {
        let transition = self.transition(id, Trigger::Place)?;
        self.record_mut(id)?.set_position(position);
        Ok(transition)
    }

    pub fn unplace(&mut self, id: UnitId) -> Result<Transition> {
        self.transition(id, Trigger::Unplace)
    }

    pub fn reassign_team(&mut self, id: UnitId, team: Team) -> Result<()> {
        self.record_mut(id)?.reassign_team(team);
        Ok(())
    }

    /// Moves every board unit into combat.
    pub fn start_combat(&mut self) -> Vec<Transition> {
        let ids = self.ids_in(UnitState::BoardIdle);
        let transitions: Vec<_> = ids
            .into_iter()
            .filter_map(|id| self.transition(id, Trigger::CombatStart).ok())
            .collect();
        info!(target: "combat_core.roster", units = transitions.len(), "combat started");
        transitions
    }

    /// Survivors are restored to full health and return to the board.
    /// Fallen player units are revived in place. Undelivered damage is
    /// discarded.
    pub fn end_combat(&mut self) -> Vec<Transition> {
        let dropped = self.mailbox.len();
        self.mailbox.clear();
        let ids = self.ids_in(UnitState::Combat);
        let mut transitions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(unit) = self.units.get_mut(&id) {
                unit.reset_after_combat();
            }
            if let Ok(transition) = self.transition(id, Trigger::CombatEnd) {
                transitions.push(transition);
            }
        }
        let survivors = transitions.len();
        for id in self.fallen_players() {
            match self.revive(id) {
                Ok(transition) => transitions.push(transition),
                Err(err) => {
                    debug!(target: "combat_core.roster", unit = %id, %err, "revival skipped")
                }
            }
        }
        info!(
            target: "combat_core.roster",
            survivors,
            revived = transitions.len() - survivors,
            dropped_damage = dropped,
            "combat ended"
        );
        transitions
    }

    /// Ends the round, then benches everything on the board.
    pub fn full_reset_to_prep(&mut self) -> Vec<Transition> {
        let mut transitions = self.end_combat();
        for id in self.ids_in(UnitState::BoardIdle) {
            if let Ok(transition) = self.unplace(id) {
                transitions.push(transition);
            }
        }
        let benched = self.ids_in(UnitState::Bench).len();
        info!(target: "combat_core.roster", benched, "reset to prep");
        transitions
    }

    fn fallen_players(&self) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|u| u.team() == Team::Player && u.state() == UnitState::Removed)
            .map(UnitRecord::id)
            .collect()
    }

    /// Rebuilds a removed record under the same id and puts it back where it
    /// fell.
    fn revive(&mut self, id: UnitId) -> Result<Transition> {
        let fallen = self.get(id).ok_or(CombatError::UnknownUnit(id))?;
        let position = fallen.position();
        let mut unit = UnitRecord::new(id, fallen.template());
        unit.on_begin_play();
        self.units.insert(id, unit);
        self.corpses.retain(|corpse| corpse.id != id);
        let transition = self.place(id, position)?;
        self.events.push(CombatEvent::Revived { unit: id });
        Ok(transition)
    }

    /// Resolves immediately. A source that is no longer in the roster is
    /// treated as absent.
    pub fn resolve(&mut self, target: UnitId, mut event: DamageEvent) -> Result<Resolution> {
        if event.source.is_some_and(|source| !self.contains(source)) {
            event.source = None;
        }
        let elapsed = self.elapsed;
        let unit = self.units.get_mut(&target).ok_or(CombatError::UnknownUnit(target))?;
        let resolution = self.resolver.resolve(unit, &event)?;
        let name = unit.name().to_owned();
        let team = unit.team();

        if resolution.mitigated_amount > 0.0 {
            self.events.push(CombatEvent::Damaged {
                unit: target,
                source: event.source,
                kind: event.kind,
                amount: resolution.mitigated_amount,
                health: resolution.new_health,
            });
        }
        if let Some(transition) = resolution.transition {
            self.push_transition(transition);
        }
        if resolution.outcome == Outcome::Dead {
            self.events.push(CombatEvent::Died {
                unit: target,
                name,
                killer: event.source,
                at: elapsed,
            });
            self.corpses.push(Corpse {
                id: target,
                remaining: self.rules.corpse_delay(team),
            });
        }
        Ok(resolution)
    }

    /// Queues damage for the next tick.
    pub fn submit(&mut self, target: UnitId, event: DamageEvent) {
        self.mailbox.push_back(PendingDamage { target, event });
    }

    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    /// Resolves queued damage in submission order. Rejected entries (for
    /// example hits on a unit that already died this tick) are dropped.
    pub fn flush_mailbox(&mut self) -> usize {
        let mut resolved = 0;
        while let Some(PendingDamage { target, event }) = self.mailbox.pop_front() {
            match self.resolve(target, event) {
                Ok(_) => resolved += 1,
                Err(err) => {
                    debug!(target: "combat_core.roster", unit = %target, %err, "dropped queued damage")
                }
            }
        }
        resolved
    }

    pub fn heal(&mut self, id: UnitId, amount: f32) -> Result<f32> {
        Ok(self.record_mut(id)?.heal(amount))
    }

    /// One frame: timers and combat actions, then queued damage and corpses.
    pub fn tick(&mut self, delta_seconds: f32) {
        if !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return;
        }
        self.elapsed += delta_seconds;
        for unit in self.units.values_mut() {
            unit.on_tick(delta_seconds);
        }
        self.drive_combat(delta_seconds);
        self.flush_mailbox();
        self.collect_corpses(delta_seconds);
    }

    fn collect_corpses(&mut self, delta_seconds: f32) {
        let mut expired = Vec::new();
        self.corpses.retain_mut(|corpse| {
            corpse.remaining -= delta_seconds;
            if corpse.remaining <= 0.0 {
                expired.push(corpse.id);
                false
            } else {
                true
            }
        });
        for id in expired {
            let Some(unit) = self.units.get_mut(&id) else {
                continue;
            };
            if unit.team() == Team::Player {
                unit.hide();
                debug!(target: "combat_core.roster", unit = %id, "corpse hidden");
                self.events.push(CombatEvent::Hidden { unit: id });
            } else {
                self.units.remove(&id);
                info!(target: "combat_core.roster", unit = %id, "corpse collected");
                self.events.push(CombatEvent::Collected { unit: id });
            }
        }
    }

    /// Post-mortem attribution while the corpse is still retained.
    pub fn killer_of(&self, id: UnitId) -> Result<Option<UnitId>> {
        self.get(id)
            .map(UnitRecord::killed_by)
            .ok_or(CombatError::UnknownUnit(id))
    }

    /// Drops a removed record and spawns a fresh benched copy of it.
    pub fn return_to_pool(&mut self, id: UnitId) -> Result<UnitId> {
        let unit = self.get(id).ok_or(CombatError::UnknownUnit(id))?;
        if unit.state() != UnitState::Removed {
            return Err(CombatError::NotRemoved {
                unit: id,
                state: unit.state(),
            });
        }
        let template = unit.template();
        self.units.remove(&id);
        self.corpses.retain(|corpse| corpse.id != id);
        let fresh = self.spawn(template)?;
        self.begin_play(fresh)?;
        info!(target: "combat_core.roster", unit = %id, replacement = %fresh, "returned to pool");
        Ok(fresh)
    }

    /// Number of `team` units currently fighting.
    pub fn fighting(&self, team: Team) -> usize {
        self.units
            .values()
            .filter(|u| u.team() == team && u.state() == UnitState::Combat)
            .count()
    }

    pub fn outcome(&self) -> MatchOutcome {
        match (self.fighting(Team::Player), self.fighting(Team::Enemy)) {
            (0, 0) => MatchOutcome::Draw,
            (_, 0) => MatchOutcome::Victory { team: Team::Player },
            (0, _) => MatchOutcome::Victory { team: Team::Enemy },
            _ => MatchOutcome::Ongoing,
        }
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    fn ids_in(&self, state: UnitState) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|u| u.state() == state)
            .map(UnitRecord::id)
            .collect()
    }

    fn push_transition(&mut self, transition: Transition) {
        self.events.push(CombatEvent::StateChanged {
            unit: transition.unit,
            from: transition.from,
            to: transition.to,
            trigger: transition.trigger,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mitigation::NoMitigation;
    use crate::unit::UnitStats;

    fn template(name: &str, team: Team) -> UnitTemplate {
        UnitTemplate::new(name, team, UnitStats::default())
    }

    fn fighting_pair() -> (Roster, UnitId, UnitId) {
        let mut roster = Roster::default().with_mitigation(NoMitigation);
        let knight = roster.spawn(template("Knight", Team::Player)).unwrap();
        let goblin = roster.spawn(template("Goblin", Team::Enemy)).unwrap();
        roster.place(knight, BoardPosition::new(0.0, 0.0)).unwrap();
        roster.place(goblin, BoardPosition::new(0.0, 900.0)).unwrap();
        roster.start_combat();
        (roster, knight, goblin)
    }

    #[test]
    fn spawn_rejects_invalid_stats() {
        let mut roster = Roster::default();
        let bad = UnitTemplate::new("Ghost", Team::Enemy, UnitStats::default().with_max_health(f32::NAN));
        assert!(matches!(
            roster.spawn(bad),
            Err(CombatError::InvalidStats { field: "max_health", .. })
        ));
        assert!(roster.is_empty());
    }

    #[test]
    fn placement_requires_bench() {
        let (mut roster, knight, _) = fighting_pair();
        let err = roster.place(knight, BoardPosition::new(5.0, 5.0)).unwrap_err();
        assert!(matches!(err, CombatError::InvalidTransition { .. }));
        assert_eq!(roster.get(knight).unwrap().position(), BoardPosition::new(0.0, 0.0));
    }

    #[test]
    fn unknown_units_are_reported() {
        let mut roster = Roster::default();
        assert_eq!(
            roster.resolve(UnitId(42), DamageEvent::physical(1.0)),
            Err(CombatError::UnknownUnit(UnitId(42)))
        );
    }

    #[test]
    fn kill_attribution_survives_until_collection() {
        let (mut roster, knight, goblin) = fighting_pair();
        let resolution = roster
            .resolve(goblin, DamageEvent::true_damage(150.0).with_source(knight))
            .unwrap();
        assert_eq!(resolution.outcome, Outcome::Dead);
        assert_eq!(roster.killer_of(goblin), Ok(Some(knight)));
        assert_eq!(roster.outcome(), MatchOutcome::Victory { team: Team::Player });

        roster.tick(1.0);
        assert!(roster.contains(goblin));
        roster.tick(1.0);
        assert!(!roster.contains(goblin));
        assert_eq!(roster.killer_of(goblin), Err(CombatError::UnknownUnit(goblin)));
        assert!(roster
            .events()
            .contains(&CombatEvent::Collected { unit: goblin }));
    }

    #[test]
    fn vanished_sources_are_dropped() {
        let (mut roster, knight, goblin) = fighting_pair();
        roster
            .resolve(goblin, DamageEvent::true_damage(100.0).with_source(UnitId(99)))
            .unwrap();
        assert_eq!(roster.killer_of(goblin), Ok(None));
        assert!(roster.contains(knight));
    }

    #[test]
    fn mailbox_is_fifo_and_drops_hits_on_the_dead() {
        let (mut roster, knight, goblin) = fighting_pair();
        roster.submit(goblin, DamageEvent::true_damage(60.0).with_source(knight));
        roster.submit(goblin, DamageEvent::true_damage(60.0));
        roster.submit(goblin, DamageEvent::true_damage(60.0));
        assert_eq!(roster.pending(), 3);

        assert_eq!(roster.flush_mailbox(), 2);
        assert_eq!(roster.pending(), 0);
        assert_eq!(roster.killer_of(goblin), Ok(None));
        assert_eq!(roster.get(goblin).unwrap().state(), UnitState::Removed);
    }

    #[test]
    fn end_combat_restores_survivors() {
        let (mut roster, knight, goblin) = fighting_pair();
        roster.resolve(knight, DamageEvent::physical(45.0)).unwrap();
        roster.submit(goblin, DamageEvent::physical(5.0));
        let transitions = roster.end_combat();
        assert_eq!(transitions.len(), 2);
        assert_eq!(roster.pending(), 0);

        let knight = roster.get(knight).unwrap();
        assert_eq!(knight.state(), UnitState::BoardIdle);
        assert_eq!(knight.current_health(), 100.0);
        assert_eq!(knight.current_mana(), 0.0);
    }

    #[test]
    fn fallen_players_are_hidden_not_collected() {
        let (mut roster, knight, _) = fighting_pair();
        roster.resolve(knight, DamageEvent::true_damage(500.0)).unwrap();
        roster.tick(1.0);
        assert!(!roster.get(knight).unwrap().is_hidden());
        roster.tick(1.0);

        let knight_record = roster.get(knight).unwrap();
        assert!(knight_record.is_hidden());
        assert_eq!(knight_record.state(), UnitState::Removed);
        assert!(roster.events().contains(&CombatEvent::Hidden { unit: knight }));
        assert!(!roster.events().contains(&CombatEvent::Collected { unit: knight }));
    }

    #[test]
    fn end_combat_revives_fallen_players_in_place() {
        let (mut roster, knight, goblin) = fighting_pair();
        roster.resolve(knight, DamageEvent::true_damage(500.0).with_source(goblin)).unwrap();
        roster.tick(2.0);

        let transitions = roster.end_combat();
        assert_eq!(transitions.len(), 2);
        let revived = roster.get(knight).unwrap();
        assert_eq!(revived.state(), UnitState::BoardIdle);
        assert_eq!(revived.current_health(), 100.0);
        assert_eq!(revived.position(), BoardPosition::new(0.0, 0.0));
        assert_eq!(revived.killed_by(), None);
        assert!(!revived.is_hidden());
        assert!(roster.events().contains(&CombatEvent::Revived { unit: knight }));

        roster.tick(5.0);
        assert!(!roster.get(knight).unwrap().is_hidden());
    }

    #[test]
    fn fallen_enemies_stay_down_after_the_round() {
        let (mut roster, _, goblin) = fighting_pair();
        roster.resolve(goblin, DamageEvent::true_damage(500.0)).unwrap();
        roster.end_combat();
        assert_eq!(roster.get(goblin).unwrap().state(), UnitState::Removed);
        roster.tick(2.0);
        assert!(!roster.contains(goblin));
    }

    #[test]
    fn full_reset_benches_survivors_and_the_fallen() {
        let (mut roster, knight, goblin) = fighting_pair();
        roster.resolve(knight, DamageEvent::true_damage(500.0)).unwrap();
        roster.full_reset_to_prep();

        for id in [knight, goblin] {
            let unit = roster.get(id).unwrap();
            assert_eq!(unit.state(), UnitState::Bench);
            assert_eq!(unit.current_health(), unit.stats().max_health);
        }
        assert_eq!(roster.outcome(), MatchOutcome::Draw);
    }

    #[test]
    fn only_removed_units_return_to_pool() {
        let (mut roster, knight, goblin) = fighting_pair();
        assert!(matches!(
            roster.return_to_pool(knight),
            Err(CombatError::NotRemoved { state: UnitState::Combat, .. })
        ));

        roster.resolve(goblin, DamageEvent::true_damage(500.0)).unwrap();
        let fresh = roster.return_to_pool(goblin).unwrap();
        assert_ne!(fresh, goblin);
        assert!(!roster.contains(goblin));
        let fresh = roster.get(fresh).unwrap();
        assert_eq!(fresh.name(), "Goblin");
        assert_eq!(fresh.state(), UnitState::Bench);
        assert_eq!(fresh.current_health(), 100.0);
    }

    #[test]
    fn outcome_without_fighters_is_a_draw() {
        let roster = Roster::default();
        assert_eq!(roster.outcome(), MatchOutcome::Draw);
        let (roster, _, _) = fighting_pair();
        assert_eq!(roster.outcome(), MatchOutcome::Ongoing);
    }
}
