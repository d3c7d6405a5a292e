use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CombatError, Result};
use crate::state::UnitState;
use crate::team::Team;

const DEFAULT_MAX_HEALTH: f32 = 100.0;
const DEFAULT_ATTACK_DAMAGE: f32 = 10.0;
const DEFAULT_ATTACK_SPEED: f32 = 1.0;
const DEFAULT_ATTACK_RANGE: f32 = 150.0;
const DEFAULT_MOVE_SPEED: f32 = 300.0;
const DEFAULT_MAX_MANA: f32 = 50.0;

/// Roster handle for a unit. Holding one never keeps the unit alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardPosition {
    pub x: f32,
    pub y: f32,
}

impl BoardPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: BoardPosition) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Moves up to `max_step` toward `target`, never closer than `stop_at`.
    pub fn step_toward(self, target: BoardPosition, max_step: f32, stop_at: f32) -> BoardPosition {
        let distance = self.distance_to(target);
        let travel = (distance - stop_at).min(max_step);
        if travel <= 0.0 || distance <= f32::EPSILON {
            return self;
        }
        let t = travel / distance;
        BoardPosition {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
        }
    }
}

impl From<[f32; 2]> for BoardPosition {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// Tunables set at spawn or level-up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    pub max_health: f32,
    pub star_level: u32,
    pub attack_damage: f32,
    /// Attacks per second.
    pub attack_speed: f32,
    pub attack_range: f32,
    pub move_speed: f32,
    pub armor: f32,
    pub magic_resist: f32,
    pub max_mana: f32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_health: DEFAULT_MAX_HEALTH,
            star_level: 1,
            attack_damage: DEFAULT_ATTACK_DAMAGE,
            attack_speed: DEFAULT_ATTACK_SPEED,
            attack_range: DEFAULT_ATTACK_RANGE,
            move_speed: DEFAULT_MOVE_SPEED,
            armor: 0.0,
            magic_resist: 0.0,
            max_mana: DEFAULT_MAX_MANA,
        }
    }
}

impl UnitStats {
    pub fn with_max_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health;
        self
    }

    pub fn with_resistances(mut self, armor: f32, magic_resist: f32) -> Self {
        self.armor = armor;
        self.magic_resist = magic_resist;
        self
    }

    pub fn with_attack(mut self, damage: f32, speed: f32, range: f32) -> Self {
        self.attack_damage = damage;
        self.attack_speed = speed;
        self.attack_range = range;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_health", self.max_health),
            ("attack_speed", self.attack_speed),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CombatError::InvalidStats { field, value });
            }
        }
        let non_negative = [
            ("attack_damage", self.attack_damage),
            ("attack_range", self.attack_range),
            ("move_speed", self.move_speed),
            ("armor", self.armor),
            ("magic_resist", self.magic_resist),
            ("max_mana", self.max_mana),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CombatError::InvalidStats { field, value });
            }
        }
        if self.star_level == 0 {
            return Err(CombatError::InvalidStats {
                field: "star_level",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Everything needed to (re)spawn a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub name: String,
    pub team: Team,
    pub stats: UnitStats,
}

impl UnitTemplate {
    pub fn new(name: impl Into<String>, team: Team, stats: UnitStats) -> Self {
        Self {
            name: name.into(),
            team,
            stats,
        }
    }
}

/// One combat participant. Engine wrappers own a [`UnitId`] and reach the
/// record through the roster.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnitRecord {
    id: UnitId,
    name: String,
    team: Team,
    state: UnitState,
    stats: UnitStats,
    current_health: f32,
    current_mana: f32,
    attack_cooldown: f32,
    casting_remaining: f32,
    position: BoardPosition,
    target: Option<UnitId>,
    killed_by: Option<UnitId>,
    hidden: bool,
}

impl UnitRecord {
    /// Starts on the bench at full health.
    pub fn new(id: UnitId, template: UnitTemplate) -> Self {
        let UnitTemplate { name, team, stats } = template;
        Self {
            id,
            name,
            team,
            state: UnitState::Bench,
            current_health: stats.max_health,
            stats,
            current_mana: 0.0,
            attack_cooldown: 0.0,
            casting_remaining: 0.0,
            position: BoardPosition::default(),
            target: None,
            killed_by: None,
            hidden: false,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn stats(&self) -> &UnitStats {
        &self.stats
    }

    pub fn max_health(&self) -> f32 {
        self.stats.max_health
    }

    pub fn current_health(&self) -> f32 {
        self.current_health
    }

    pub fn current_mana(&self) -> f32 {
        self.current_mana
    }

    pub fn attack_cooldown(&self) -> f32 {
        self.attack_cooldown
    }

    pub fn position(&self) -> BoardPosition {
        self.position
    }

    pub fn target(&self) -> Option<UnitId> {
        self.target
    }

    pub fn killed_by(&self) -> Option<UnitId> {
        self.killed_by
    }

    pub fn is_alive(&self) -> bool {
        self.state != UnitState::Removed && self.current_health > 0.0
    }

    /// A fallen player unit that has left the board view but awaits revival.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_casting(&self) -> bool {
        self.casting_remaining > 0.0
    }

    pub fn template(&self) -> UnitTemplate {
        UnitTemplate::new(self.name.clone(), self.team, self.stats.clone())
    }

    pub fn reassign_team(&mut self, team: Team) {
        if self.team != team {
            info!(target: "combat_core.unit", unit = %self.id, from = %self.team, to = %team, "team reassigned");
            self.team = team;
            self.target = None;
        }
    }

    /// Host activation hook.
    pub fn on_begin_play(&mut self) {
        self.current_health = self.stats.max_health;
        self.current_mana = 0.0;
        self.attack_cooldown = 0.0;
        self.casting_remaining = 0.0;
        info!(
            target: "combat_core.unit",
            unit = %self.id,
            name = %self.name,
            team = %self.team,
            health = self.current_health,
            max = self.stats.max_health,
            "unit initialized"
        );
    }

    /// Per-frame host hook. Only combat timers advance.
    pub fn on_tick(&mut self, delta_seconds: f32) {
        if !delta_seconds.is_finite() || delta_seconds <= 0.0 || self.state != UnitState::Combat {
            return;
        }
        if self.casting_remaining > 0.0 {
            self.casting_remaining = (self.casting_remaining - delta_seconds).max(0.0);
            if self.casting_remaining == 0.0 {
                info!(target: "combat_core.unit", unit = %self.id, "finished casting");
            }
        } else {
            self.attack_cooldown = (self.attack_cooldown - delta_seconds).max(0.0);
        }
    }

    /// Returns the amount actually restored. Removed units cannot be healed.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.state == UnitState::Removed || !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current_health;
        self.current_health = (before + amount).min(self.stats.max_health);
        self.current_health - before
    }

    pub(crate) fn set_current_health(&mut self, health: f32) {
        self.current_health = health.clamp(0.0, self.stats.max_health);
    }

    pub(crate) fn gain_mana(&mut self, amount: f32) {
        self.current_mana = (self.current_mana + amount).min(self.stats.max_mana);
    }

    pub(crate) fn mana_full(&self) -> bool {
        self.stats.max_mana > 0.0 && self.current_mana >= self.stats.max_mana
    }

    pub(crate) fn begin_cast(&mut self, duration: f32) {
        self.casting_remaining = duration;
        self.current_mana = 0.0;
    }

    pub(crate) fn start_attack_cooldown(&mut self) {
        self.attack_cooldown = 1.0 / self.stats.attack_speed;
    }

    pub(crate) fn set_target(&mut self, target: Option<UnitId>) {
        self.target = target;
    }

    pub(crate) fn set_position(&mut self, position: BoardPosition) {
        self.position = position;
    }

    pub(crate) fn hide(&mut self) {
        self.hidden = true;
    }

    pub(crate) fn record_killer(&mut self, killer: Option<UnitId>) {
        self.killed_by = killer;
    }

    /// Applies the entry effects of `to` and switches state.
    pub(crate) fn enter_state(&mut self, to: UnitState) {
        match to {
            UnitState::Bench | UnitState::Removed => {
                self.target = None;
                self.casting_remaining = 0.0;
            }
            UnitState::BoardIdle | UnitState::Combat => {
                self.attack_cooldown = 0.0;
            }
        }
        self.state = to;
    }

    /// Round reset for survivors, before they leave combat.
    pub(crate) fn reset_after_combat(&mut self) {
        self.current_health = self.stats.max_health;
        self.current_mana = 0.0;
        self.attack_cooldown = 0.0;
        self.casting_remaining = 0.0;
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knight() -> UnitRecord {
        UnitRecord::new(
            UnitId(1),
            UnitTemplate::new("Knight", Team::Player, UnitStats::default()),
        )
    }

    #[test]
    fn new_units_start_benched_at_full_health() {
        let unit = knight();
        assert_eq!(unit.state(), UnitState::Bench);
        assert_eq!(unit.current_health(), 100.0);
        assert!(unit.is_alive());
    }

    #[test]
    fn begin_play_restores_health() {
        let mut unit = knight();
        unit.set_current_health(12.0);
        unit.gain_mana(30.0);
        unit.on_begin_play();
        assert_eq!(unit.current_health(), unit.max_health());
        assert_eq!(unit.current_mana(), 0.0);
    }

    #[test]
    fn heal_is_clamped_to_max() {
        let mut unit = knight();
        unit.set_current_health(90.0);
        assert_eq!(unit.heal(25.0), 10.0);
        assert_eq!(unit.current_health(), 100.0);
        assert_eq!(unit.heal(-5.0), 0.0);
    }

    #[test]
    fn tick_only_runs_timers_in_combat() {
        let mut unit = knight();
        unit.start_attack_cooldown();
        unit.on_tick(0.5);
        assert_eq!(unit.attack_cooldown(), 1.0);

        unit.enter_state(UnitState::Combat);
        unit.start_attack_cooldown();
        unit.on_tick(0.25);
        assert!((unit.attack_cooldown() - 0.75).abs() < 1e-6);
        unit.on_tick(f32::NAN);
        assert!((unit.attack_cooldown() - 0.75).abs() < 1e-6);
        unit.on_tick(-1.0);
        assert!((unit.attack_cooldown() - 0.75).abs() < 1e-6);
        unit.on_tick(0.0);
        assert!((unit.attack_cooldown() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn casting_pauses_attack_cooldown() {
        let mut unit = knight();
        unit.enter_state(UnitState::Combat);
        unit.start_attack_cooldown();
        unit.begin_cast(0.5);
        unit.on_tick(0.5);
        assert!(!unit.is_casting());
        assert_eq!(unit.attack_cooldown(), 1.0);
    }

    #[test]
    fn step_toward_stops_at_range() {
        let from = BoardPosition::new(0.0, 0.0);
        let to = BoardPosition::new(100.0, 0.0);
        let stepped = from.step_toward(to, 30.0, 50.0);
        assert!((stepped.x - 30.0).abs() < 1e-4);
        assert_eq!(stepped.y, 0.0);
        assert_eq!(from.step_toward(to, 500.0, 50.0), BoardPosition::new(50.0, 0.0));
        assert_eq!(from.step_toward(to, 500.0, 150.0), from);
    }

    #[test]
    fn stats_reject_non_positive_health() {
        let err = UnitStats::default().with_max_health(0.0).validate().unwrap_err();
        assert_eq!(
            err,
            CombatError::InvalidStats {
                field: "max_health",
                value: 0.0
            }
        );
        assert!(UnitStats::default().validate().is_ok());
    }
}
