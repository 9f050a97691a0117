use thiserror::Error;
use uuid::Uuid;

use crate::movement::BalanceKey;

/// Everything that can go wrong while applying a movement. The first three
/// variants are deterministic client errors; only `Transient` may be
/// retried, and only by re-running the whole operation.
#[derive(Debug, Error)]
pub enum MovementError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("insufficient quantity at {key:?}: {available} available, {requested} requested")]
    InsufficientQuantity {
        key: BalanceKey,
        available: i64,
        requested: i64,
    },

    #[error("transient storage failure: {0}")]
    Transient(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl MovementError {
    pub fn invalid(message: impl Into<String>) -> Self {
        MovementError::InvalidRequest(message.into())
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        MovementError::NotFound { entity, id }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, MovementError::Transient(_))
    }
}
