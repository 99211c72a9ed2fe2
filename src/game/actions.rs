//! Non-battle gathering actions. Each action has a fixed energy cost that is paid together
//! with its reward, or not at all.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::GameError;
use super::player::PlayerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DigTrash,
    CollectBottles,
    TrainStrength,
}

/// What an action costs and pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionTable {
    pub energy_cost: u32,
    pub exp: u64,
    pub money_rub: i64,
    pub strength: i32,
    pub pity: i32,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::DigTrash,
        ActionKind::CollectBottles,
        ActionKind::TrainStrength,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::DigTrash => "dig_trash",
            ActionKind::CollectBottles => "collect_bottles",
            ActionKind::TrainStrength => "train_strength",
        }
    }

    pub fn table(self) -> ActionTable {
        match self {
            ActionKind::DigTrash => ActionTable {
                energy_cost: 10,
                exp: 5,
                money_rub: 10,
                strength: 0,
                pity: 1,
            },
            ActionKind::CollectBottles => ActionTable {
                energy_cost: 5,
                exp: 2,
                money_rub: 5,
                strength: 0,
                pity: 0,
            },
            ActionKind::TrainStrength => ActionTable {
                energy_cost: 15,
                exp: 3,
                money_rub: 0,
                strength: 1,
                pity: 0,
            },
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ActionKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| GameError::UnknownAction(wanted.to_string()))
    }
}

/// Apply `kind` to `player`. On `InsufficientEnergy` the record is unchanged.
pub fn apply(player: &mut PlayerRecord, kind: ActionKind) -> Result<ActionTable, GameError> {
    let t = kind.table();
    player.spend_energy(t.energy_cost)?;
    player.money_rub = player.money_rub.saturating_add(t.money_rub);
    player.strength = player.strength.saturating_add(t.strength);
    player.pity = player.pity.saturating_add(t.pity);
    player.grant_exp(t.exp);
    log::debug!(
        "action {} by {}: energy now {}/{}",
        kind,
        player.user_id,
        player.energy,
        player.max_energy
    );
    Ok(t)
}
