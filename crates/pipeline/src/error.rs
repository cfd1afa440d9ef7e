use pictor_core::error::CoreError;
use pictor_core::inference::{GenerationError, TranslationError};
use pictor_core::storage::StorageError;
use pictor_core::types::{Credits, DbId};
use pictor_db::repositories::LedgerError;

use crate::queue::QueueError;

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL foreign-key-violation SQLSTATE.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// How the queue consumer settles a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient failure: release for another attempt after a backoff.
    Retry,
    /// Legitimate business failure: dead-letter without retrying.
    Reject,
    /// Integrity or payload bug: dead-letter immediately and alert.
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Model {0} not found")]
    ModelNotFound(DbId),

    #[error("Model {0} is not an image generation model")]
    ModelWrongType(DbId),

    #[error("Model {0} is not active")]
    ModelInactive(DbId),

    #[error("No active image generation model configured")]
    NoActiveModel,

    #[error("Account {0} not found")]
    AccountNotFound(DbId),

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Credits, required: Credits },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("Image generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue failed: {0}")]
    Queue(#[from] QueueError),

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Malformed job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl PipelineError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Translation(_)
            | Self::Generation(_)
            | Self::Storage(_)
            | Self::Queue(_)
            | Self::Database(_) => Disposition::Retry,
            Self::InsufficientFunds { .. }
            | Self::AccountNotFound(_)
            | Self::EmptyPrompt
            | Self::Validation(_)
            | Self::ModelNotFound(_)
            | Self::ModelWrongType(_)
            | Self::ModelInactive(_)
            | Self::NoActiveModel
            | Self::NotFound(_) => Disposition::Reject,
            Self::Integrity(_) | Self::Payload(_) => Disposition::Fatal,
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let constraint = db_err.constraint().unwrap_or("unknown constraint");
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return Self::Integrity(format!("unique violation on {constraint}"));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return Self::Integrity(format!("foreign key violation on {constraint}"));
                }
                _ => {}
            }
        }
        Self::Database(err)
    }
}

impl From<LedgerError> for PipelineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(id) => Self::AccountNotFound(id),
            LedgerError::InvalidAmount(amount) => {
                Self::Validation(format!("Ledger amount must be positive, got {amount}"))
            }
            LedgerError::InsufficientFunds { balance, requested } => Self::InsufficientFunds {
                balance,
                required: requested,
            },
            err @ LedgerError::BalanceOverflow { .. } => Self::Validation(err.to_string()),
            LedgerError::Database(e) => e.into(),
        }
    }
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            CoreError::NotFound { entity, .. } => Self::NotFound(entity),
            other => Self::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_failures_are_retried() {
        assert_eq!(
            PipelineError::Translation(TranslationError("timeout".into())).disposition(),
            Disposition::Retry
        );
        assert_eq!(
            PipelineError::Generation(GenerationError("oom".into())).disposition(),
            Disposition::Retry
        );
        assert_eq!(
            PipelineError::Storage(StorageError::Backend("503".into())).disposition(),
            Disposition::Retry
        );
        assert_eq!(
            PipelineError::Database(sqlx::Error::PoolTimedOut).disposition(),
            Disposition::Retry
        );
    }

    #[test]
    fn late_insufficient_funds_is_rejected_not_retried() {
        let err = PipelineError::InsufficientFunds {
            balance: 3,
            required: 7,
        };
        assert_eq!(err.disposition(), Disposition::Reject);
    }

    #[test]
    fn integrity_and_payload_errors_are_fatal() {
        assert_eq!(
            PipelineError::Integrity("uq_predictions_storage_key".into()).disposition(),
            Disposition::Fatal
        );
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(PipelineError::from(bad).disposition(), Disposition::Fatal);
    }

    #[test]
    fn ledger_errors_map_to_pipeline_errors() {
        let err = PipelineError::from(LedgerError::InsufficientFunds {
            balance: 1,
            requested: 2,
        });
        assert!(matches!(
            err,
            PipelineError::InsufficientFunds { balance: 1, required: 2 }
        ));
        assert!(matches!(
            PipelineError::from(LedgerError::AccountNotFound(9)),
            PipelineError::AccountNotFound(9)
        ));
    }
}
