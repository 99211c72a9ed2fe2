//! Request-layer core shared by the HTTP router and the bot.
//!
//! Each public operation follows the same shape: validate ids, lock the store, fetch or
//! create the player, credit regenerated energy, run the rule, persist when the record
//! changed, return a copy of the result.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::game::actions::{self, ActionKind, ActionTable};
use crate::game::battle::{BattleEngine, BattleState, LootReward, TurnReport};
use crate::game::catalog::BattleCatalog;
use crate::game::dice::Dice;
use crate::game::energy;
use crate::game::{GameError, PlayerRecord};
use crate::metrics::Metrics;
use crate::storage::PlayerStore;
use crate::validation::{validate_identifier, validate_player_id};

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: ActionKind,
    pub reward: ActionTable,
    pub user: PlayerRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattleOutcome {
    pub battle: BattleState,
    pub user: PlayerRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub report: TurnReport,
    pub battle: BattleState,
    pub user: PlayerRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct LootOutcome {
    pub loot: LootReward,
    pub boss_id: String,
    pub player_won: bool,
    pub user: PlayerRecord,
}

struct ServiceState {
    store: PlayerStore,
    dice: Box<dyn Dice + Send>,
}

pub struct GameService {
    catalog: Arc<BattleCatalog>,
    state: Mutex<ServiceState>,
    metrics: Metrics,
}

impl GameService {
    pub fn new(catalog: Arc<BattleCatalog>, store: PlayerStore, dice: Box<dyn Dice + Send>) -> Self {
        GameService {
            catalog,
            state: Mutex::new(ServiceState { store, dice }),
            metrics: Metrics::new(),
        }
    }

    pub fn catalog(&self) -> &BattleCatalog {
        &self.catalog
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn player_count(&self) -> usize {
        self.state.lock().await.store.len()
    }

    /// Run `op` against the player's record under the store lock.
    ///
    /// Regeneration and creation count as mutations, so they are persisted even when `op`
    /// itself fails. A storage error replaces the result of a successful `op`; the
    /// in-memory record keeps the computed state either way.
    async fn with_player<T>(
        &self,
        user_id: &str,
        op: impl FnOnce(&mut PlayerRecord, &mut dyn Dice) -> Result<T, GameError>,
    ) -> Result<(T, PlayerRecord), GameError> {
        let user_id = validate_player_id(user_id)?;
        let now = Utc::now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let (record, created) = state.store.get_or_create(&user_id, now);
        let before = record.clone();
        let regained = energy::regen(record, now);
        if regained > 0 {
            log::trace!("player {} regained {} energy", user_id, regained);
        }
        let result = op(record, state.dice.as_mut());
        let snapshot = record.clone();

        if created || snapshot != before {
            if let Err(e) = state.store.save().await {
                self.metrics.inc_storage_error();
                log::error!("failed to persist player {}: {}", user_id, e);
                if result.is_ok() {
                    return Err(e);
                }
            }
        }
        result.map(|value| (value, snapshot))
    }

    /// Current state of a player after regeneration. Creates the player on first use.
    pub async fn get_player(&self, user_id: &str) -> Result<PlayerRecord, GameError> {
        let ((), user) = self.with_player(user_id, |_, _| Ok(())).await?;
        Ok(user)
    }

    pub async fn perform_action(
        &self,
        user_id: &str,
        action: &str,
    ) -> Result<ActionOutcome, GameError> {
        let kind: ActionKind = validate_identifier("action", action)?.parse()?;
        let (reward, user) = self
            .with_player(user_id, |player, _| actions::apply(player, kind))
            .await?;
        self.metrics.inc_action();
        Ok(ActionOutcome {
            action: kind,
            reward,
            user,
        })
    }

    pub async fn start_battle(
        &self,
        user_id: &str,
        boss_id: &str,
    ) -> Result<BattleOutcome, GameError> {
        let boss_id = validate_identifier("boss_id", boss_id)?;
        let engine = BattleEngine::new(&self.catalog);
        let (battle, user) = self
            .with_player(user_id, |player, _| engine.start(player, &boss_id).cloned())
            .await?;
        self.metrics.inc_battle_started();
        Ok(BattleOutcome { battle, user })
    }

    pub async fn take_turn(&self, user_id: &str, move_id: &str) -> Result<TurnOutcome, GameError> {
        let move_id = validate_identifier("move_id", move_id)?;
        let engine = BattleEngine::new(&self.catalog);
        let ((report, battle), user) = self
            .with_player(user_id, |player, dice| {
                let report = engine.take_turn(player, dice, &move_id)?;
                let battle = player.battle.clone().ok_or(GameError::NotActive)?;
                Ok((report, battle))
            })
            .await?;
        if !report.lines.is_empty() {
            self.metrics.inc_turn();
            if report.finished {
                self.metrics.record_outcome(report.player_won);
            }
        }
        Ok(TurnOutcome {
            report,
            battle,
            user,
        })
    }

    /// Abandon the active battle; it finishes as a loss and can then be ended.
    pub async fn flee(&self, user_id: &str) -> Result<TurnOutcome, GameError> {
        let engine = BattleEngine::new(&self.catalog);
        let ((report, battle), user) = self
            .with_player(user_id, |player, _| {
                let report = engine.forfeit(player)?;
                let battle = player.battle.clone().ok_or(GameError::NotActive)?;
                Ok((report, battle))
            })
            .await?;
        if !report.lines.is_empty() {
            self.metrics.record_outcome(false);
        }
        Ok(TurnOutcome {
            report,
            battle,
            user,
        })
    }

    /// Pay out and clear a finished battle. Payout and clearing are persisted together.
    pub async fn end_battle(&self, user_id: &str) -> Result<LootOutcome, GameError> {
        let engine = BattleEngine::new(&self.catalog);
        let ((loot, boss_id, player_won), user) = self
            .with_player(user_id, |player, dice| {
                let (boss_id, player_won) = match player.battle.as_ref() {
                    Some(b) => (b.boss_id.clone(), b.player_won),
                    None => return Err(GameError::NotActive),
                };
                let loot = engine.end(player, dice)?;
                Ok((loot, boss_id, player_won))
            })
            .await?;
        if !loot.is_empty() {
            self.metrics.inc_loot_payout();
        }
        Ok(LootOutcome {
            loot,
            boss_id,
            player_won,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dice::ScriptedDice;

    async fn service(dir: &std::path::Path) -> GameService {
        let store = PlayerStore::open(dir).await.unwrap();
        GameService::new(
            Arc::new(BattleCatalog::default()),
            store,
            Box::new(ScriptedDice::constant(0.5)),
        )
    }

    #[tokio::test]
    async fn first_read_creates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let user = svc.get_player("100").await.unwrap();
        assert_eq!(user.level, 1);
        assert_eq!(svc.player_count().await, 1);
        let reopened = PlayerStore::open(dir.path()).await.unwrap();
        assert!(reopened.get("100").is_some());
    }

    #[tokio::test]
    async fn invalid_ids_are_rejected_before_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        assert!(matches!(
            svc.get_player("../etc").await,
            Err(GameError::Validation(_))
        ));
        assert!(matches!(
            svc.perform_action("1", "").await,
            Err(GameError::Validation(_))
        ));
        assert_eq!(svc.player_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_boss_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        assert!(matches!(
            svc.start_battle("1", "nobody").await,
            Err(GameError::UnknownBoss(_))
        ));
        assert!(svc.get_player("1").await.unwrap().battle.is_none());
    }
}
