//! Game rules: player records, energy, gathering actions and boss battles.
//!
//! Everything in here is synchronous and storage-agnostic. Callers load a
//! [`PlayerRecord`], mutate it through these functions and persist the result.

pub mod actions;
pub mod battle;
pub mod catalog;
pub mod dice;
pub mod energy;
pub mod errors;
pub mod player;

pub use actions::{ActionKind, ActionTable};
pub use battle::{BattleEngine, BattleState, LootReward, TurnReport};
pub use catalog::{BattleCatalog, Boss, Effect, EffectKind, Move};
pub use dice::{Dice, RngDice, ScriptedDice};
pub use errors::GameError;
pub use player::PlayerRecord;
