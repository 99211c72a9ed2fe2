use thiserror::Error;

use crate::validation::ValidationError;

/// Errors surfaced by the game core and the request layer around it.
///
/// Every variant except `Storage`/`Serialization` is a caller-side precondition failure:
/// the operation that produced it left the player record untouched.
#[derive(Debug, Error)]
pub enum GameError {
    /// Missing or malformed request field.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The player cannot pay the energy cost of the requested action or move.
    #[error("not enough energy: need {needed}, have {available}")]
    InsufficientEnergy { needed: u32, available: u32 },

    /// Move id not present in the battle catalog.
    #[error("unknown move: {0}")]
    UnknownMove(String),

    /// Boss id not present in the battle catalog.
    #[error("unknown boss: {0}")]
    UnknownBoss(String),

    /// Action name not recognised by the action resolver.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A battle is already in progress for this player.
    #[error("a battle is already in progress")]
    AlreadyActive,

    /// No battle is in progress for this player.
    #[error("no active battle")]
    NotActive,

    /// Loot was requested before the battle reached a result.
    #[error("battle is not finished yet")]
    NotFinished,

    /// Wrapper around IO errors from the player store.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Wrapper around JSON encode/decode errors from the player store.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GameError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Validation(_) => "validation_error",
            GameError::InsufficientEnergy { .. } => "insufficient_energy",
            GameError::UnknownMove(_) => "unknown_move",
            GameError::UnknownBoss(_) => "unknown_boss",
            GameError::UnknownAction(_) => "unknown_action",
            GameError::AlreadyActive => "already_active",
            GameError::NotActive => "not_active",
            GameError::NotFinished => "not_finished",
            GameError::Storage(_) | GameError::Serialization(_) => "server_error",
        }
    }

    /// True for failures of the persistence layer rather than of the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, GameError::Storage(_) | GameError::Serialization(_))
    }
}
