use crate::{OrderId, TransitionError};

/// Failures surfaced by a [`crate::LedgerStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Optimistic conflict or serialization failure; the transaction may be retried.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("transaction retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("order record {0} not found")]
    NotFound(OrderId),

    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Corrupt row or other backend-specific failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Map a sqlx error into a [`StoreError`], classifying Postgres
/// serialization failures (40001) and deadlocks (40P01) as conflicts.
pub(crate) fn classify_sqlx(err: sqlx::Error) -> StoreError {
    if is_serialization_failure(&err) {
        return StoreError::Conflict(err.to_string());
    }
    StoreError::Database(err)
}

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}
