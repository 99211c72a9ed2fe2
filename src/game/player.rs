use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::battle::BattleState;

pub const START_LEVEL: u32 = 1;
pub const START_MONEY_RUB: i64 = 100;
pub const START_ENERGY: u32 = 100;
pub const START_STRENGTH: i32 = 10;
pub const START_PITY: i32 = 10;
/// Experience needed per level: reaching `level * EXP_PER_LEVEL` levels up.
pub const EXP_PER_LEVEL: u64 = 100;
/// Extra max energy granted on each level up.
pub const MAX_ENERGY_PER_LEVEL: u32 = 10;

/// Persistent state tracked per player id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user_id: String,
    pub level: u32,
    pub exp: u64,
    pub money_rub: i64,
    pub money_usd: i64,
    pub energy: u32,
    pub max_energy: u32,
    pub strength: i32,
    #[serde(default)]
    pub pity: i32,
    #[serde(default)]
    pub coolness: i32,
    /// Last time energy regeneration was credited.
    pub last_action: DateTime<Utc>,
    /// Item ids collected from boss loot.
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battle: Option<BattleState>,
}

impl PlayerRecord {
    /// Fresh record with the fixed starting stats.
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        PlayerRecord {
            user_id: user_id.to_string(),
            level: START_LEVEL,
            exp: 0,
            money_rub: START_MONEY_RUB,
            money_usd: 0,
            energy: START_ENERGY,
            max_energy: START_ENERGY,
            strength: START_STRENGTH,
            pity: START_PITY,
            coolness: 0,
            last_action: now,
            inventory: Vec::new(),
            battle: None,
        }
    }

    /// Max HP used when a battle starts.
    pub fn battle_max_hp(&self) -> i32 {
        self.strength.saturating_mul(2).saturating_add(120)
    }

    pub fn has_active_battle(&self) -> bool {
        self.battle.as_ref().map(|b| b.active).unwrap_or(false)
    }

    /// Deduct `cost` energy, or fail without touching the record.
    pub fn spend_energy(&mut self, cost: u32) -> Result<(), super::GameError> {
        if self.energy < cost {
            return Err(super::GameError::InsufficientEnergy {
                needed: cost,
                available: self.energy,
            });
        }
        self.energy -= cost;
        Ok(())
    }

    /// Add experience and apply any level ups it unlocks. Returns the number of levels gained.
    pub fn grant_exp(&mut self, amount: u64) -> u32 {
        self.exp = self.exp.saturating_add(amount);
        let mut gained = 0;
        while self.exp >= u64::from(self.level) * EXP_PER_LEVEL {
            self.level += 1;
            self.max_energy = self.max_energy.saturating_add(MAX_ENERGY_PER_LEVEL);
            gained += 1;
        }
        if gained > 0 {
            log::debug!(
                "player {} reached level {} (+{})",
                self.user_id,
                self.level,
                gained
            );
        }
        gained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_player_stats() {
        let p = PlayerRecord::new("42", Utc::now());
        assert_eq!(p.level, 1);
        assert_eq!(p.energy, 100);
        assert_eq!(p.max_energy, 100);
        assert_eq!(p.strength, 10);
        assert_eq!(p.battle_max_hp(), 140);
        assert!(!p.has_active_battle());
    }

    #[test]
    fn spend_energy_is_guarded() {
        let mut p = PlayerRecord::new("42", Utc::now());
        p.energy = 4;
        let before = p.clone();
        assert!(matches!(
            p.spend_energy(5),
            Err(crate::game::GameError::InsufficientEnergy {
                needed: 5,
                available: 4
            })
        ));
        assert_eq!(p, before);
        p.spend_energy(4).unwrap();
        assert_eq!(p.energy, 0);
    }

    #[test]
    fn exp_levels_up_repeatedly() {
        let mut p = PlayerRecord::new("42", Utc::now());
        assert_eq!(p.grant_exp(99), 0);
        assert_eq!(p.grant_exp(1), 1);
        assert_eq!(p.level, 2);
        assert_eq!(p.max_energy, 110);
        // 100 -> 350 crosses the level 2 (200) and level 3 (300) thresholds
        assert_eq!(p.grant_exp(250), 2);
        assert_eq!(p.level, 4);
        assert_eq!(p.max_energy, 130);
    }

    #[test]
    fn legacy_record_without_optional_fields_loads() {
        let json = r#"{"user_id":"7","level":1,"exp":0,"money_rub":100,"money_usd":0,
            "energy":50,"max_energy":100,"strength":1,"last_action":"2024-01-01T00:00:00Z"}"#;
        let p: PlayerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(p.pity, 0);
        assert!(p.inventory.is_empty());
        assert!(p.battle.is_none());
    }
}
