use std::fmt;

use serde::{Deserialize, Serialize};

/// Faction alignment. Drives friend/foe targeting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    #[default]
    Player,
    Enemy,
    Neutral,
}

impl Team {
    /// Neutral units never fight; everyone else fights the other side.
    pub fn is_hostile_to(self, other: Team) -> bool {
        self != Team::Neutral && other != Team::Neutral && self != other
    }

    pub fn label(self) -> &'static str {
        match self {
            Team::Player => "player",
            Team::Enemy => "enemy",
            Team::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
