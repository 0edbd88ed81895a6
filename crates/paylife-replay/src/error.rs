//! Paylife replay error types.

use paylife_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and input errors for the replay tool.
#[derive(Debug, Error)]
pub enum AppError {
    /// The dump could not be read.
    #[error("cannot read history file: {0}")]
    Io(#[from] std::io::Error),

    /// The dump is not a JSON array of stored events.
    #[error("cannot parse history file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// JSON body reported for a transaction that could not be rehydrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

impl From<&DomainError> for ErrorBody {
    fn from(err: &DomainError) -> Self {
        let error = match err {
            DomainError::Rejected(_) => "rejected",
            DomainError::CorruptedHistory { .. } => "corrupted_history",
            DomainError::UndecodableEvent { .. } => "undecodable_event",
            DomainError::ConcurrencyConflict { .. } => "concurrency_conflict",
            DomainError::LogUnavailable(_) => "log_unavailable",
            DomainError::AppendOutcomeUnknown { .. } => "append_outcome_unknown",
        };
        Self {
            error,
            message: err.to_string(),
        }
    }
}
