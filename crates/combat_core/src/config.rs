use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;
use crate::mitigation::{FlatPercentMitigation, Mitigation, NoMitigation, ResistanceMitigation};
use crate::resolver::DEFAULT_MANA_PER_HIT;
use crate::roster::Roster;
use crate::team::Team;
use crate::unit::{BoardPosition, UnitId, UnitStats, UnitTemplate};

const DEFAULT_MANA_PER_ATTACK: f32 = 10.0;
const DEFAULT_CAST_DURATION: f32 = 1.5;
const DEFAULT_PLAYER_CORPSE_DELAY: f32 = 1.5;
const DEFAULT_ENEMY_CORPSE_DELAY: f32 = 2.0;
const ROW_SPACING: f32 = 150.0;
const ENEMY_ROW_Y: f32 = 600.0;

/// Written either as a bare name (`"none"`, `"resistance"`) or as a table
/// tagged by `kind`. `flat` needs its fractions, so only the table form works.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", try_from = "PolicyInput")]
pub enum MitigationPolicy {
    None,
    #[default]
    Resistance,
    Flat {
        physical: f32,
        magical: f32,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyInput {
    Name(String),
    Table(PolicyTable),
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum PolicyTable {
    None,
    Resistance,
    Flat { physical: f32, magical: f32 },
}

impl TryFrom<PolicyInput> for MitigationPolicy {
    type Error = String;

    fn try_from(input: PolicyInput) -> Result<Self, Self::Error> {
        match input {
            PolicyInput::Name(name) => match name.as_str() {
                "none" => Ok(MitigationPolicy::None),
                "resistance" => Ok(MitigationPolicy::Resistance),
                "flat" => Err(
                    "flat mitigation needs a table: { kind = \"flat\", physical = .., magical = .. }"
                        .into(),
                ),
                other => Err(format!(
                    "unknown mitigation `{other}`, expected none, resistance or flat"
                )),
            },
            PolicyInput::Table(PolicyTable::None) => Ok(MitigationPolicy::None),
            PolicyInput::Table(PolicyTable::Resistance) => Ok(MitigationPolicy::Resistance),
            PolicyInput::Table(PolicyTable::Flat { physical, magical }) => {
                Ok(MitigationPolicy::Flat { physical, magical })
            }
        }
    }
}

impl MitigationPolicy {
    pub fn build(&self) -> Box<dyn Mitigation> {
        match *self {
            MitigationPolicy::None => Box::new(NoMitigation),
            MitigationPolicy::Resistance => Box::new(ResistanceMitigation),
            MitigationPolicy::Flat { physical, magical } => {
                Box::new(FlatPercentMitigation { physical, magical })
            }
        }
    }
}

/// Match-wide tuning shared by every unit in a roster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    pub mitigation: MitigationPolicy,
    pub mana_per_attack: f32,
    pub mana_per_hit: f32,
    /// Seconds a unit is locked out while casting.
    pub cast_duration: f32,
    /// Seconds a dead player unit stays queryable before collection.
    pub player_corpse_delay: f32,
    pub enemy_corpse_delay: f32,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            mitigation: MitigationPolicy::default(),
            mana_per_attack: DEFAULT_MANA_PER_ATTACK,
            mana_per_hit: DEFAULT_MANA_PER_HIT,
            cast_duration: DEFAULT_CAST_DURATION,
            player_corpse_delay: DEFAULT_PLAYER_CORPSE_DELAY,
            enemy_corpse_delay: DEFAULT_ENEMY_CORPSE_DELAY,
        }
    }
}

impl CombatRules {
    pub fn corpse_delay(&self, team: Team) -> f32 {
        match team {
            Team::Player => self.player_corpse_delay,
            Team::Enemy | Team::Neutral => self.enemy_corpse_delay,
        }
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        for (field, value) in [
            ("mana_per_attack", self.mana_per_attack),
            ("mana_per_hit", self.mana_per_hit),
            ("cast_duration", self.cast_duration),
            ("player_corpse_delay", self.player_corpse_delay),
            ("enemy_corpse_delay", self.enemy_corpse_delay),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScenarioError::Invalid(format!(
                    "rules.{field} must be a non-negative number, got {value}"
                )));
            }
        }
        if let MitigationPolicy::Flat { physical, magical } = self.mitigation {
            if !(0.0..=1.0).contains(&physical) || !(0.0..=1.0).contains(&magical) {
                return Err(ScenarioError::Invalid(
                    "flat mitigation fractions must lie in [0, 1]".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    #[serde(default)]
    pub team: Team,
    #[serde(flatten)]
    pub stats: UnitStats,
    #[serde(default)]
    pub position: Option<[f32; 2]>,
    /// Placed units start on the board instead of the bench.
    #[serde(default)]
    pub placed: bool,
}

impl UnitConfig {
    pub fn template(&self) -> UnitTemplate {
        UnitTemplate::new(self.name.clone(), self.team, self.stats.clone())
    }
}

/// A TOML lineup plus the rules it is played under.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rules: CombatRules,
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

impl FromStr for ScenarioConfig {
    type Err = ScenarioError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(data)?)
    }
}

impl ScenarioConfig {
    pub fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let data = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        data.parse()
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.rules.validate()?;
        if self.units.is_empty() {
            return Err(ScenarioError::Invalid("scenario has no units".into()));
        }
        for unit in &self.units {
            if unit.name.trim().is_empty() {
                return Err(ScenarioError::Invalid("unit name must not be empty".into()));
            }
            unit.stats.validate()?;
        }
        Ok(())
    }

    /// Spawns every unit into `roster` and places the ones marked `placed`.
    /// Units without a position get a slot in their team's row. Activation is
    /// left to the host.
    pub fn spawn_into(&self, roster: &mut Roster) -> Result<Vec<UnitId>, ScenarioError> {
        self.validate()?;
        let mut spawned = Vec::with_capacity(self.units.len());
        let mut row_slots = [0usize; 3];
        for unit in &self.units {
            let id = roster.spawn(unit.template())?;
            spawned.push(id);
            if !unit.placed {
                continue;
            }
            let position = match unit.position {
                Some(position) => BoardPosition::from(position),
                None => {
                    let row = unit.team as usize;
                    let slot = row_slots[row];
                    row_slots[row] += 1;
                    default_slot(unit.team, slot)
                }
            };
            roster.place(id, position)?;
        }
        Ok(spawned)
    }

    /// Headless host: a fresh roster with every unit spawned and activated.
    pub fn build_roster(&self) -> Result<Roster, ScenarioError> {
        let mut roster = Roster::new(self.rules.clone());
        for id in self.spawn_into(&mut roster)? {
            roster.begin_play(id)?;
        }
        Ok(roster)
    }
}

fn default_slot(team: Team, slot: usize) -> BoardPosition {
    let x = slot as f32 * ROW_SPACING;
    match team {
        Team::Player => BoardPosition::new(x, 0.0),
        Team::Enemy => BoardPosition::new(x, ENEMY_ROW_Y),
        Team::Neutral => BoardPosition::new(x, ENEMY_ROW_Y * 0.5),
    }
}
