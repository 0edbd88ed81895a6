//! Query handlers for the payment-transaction lifecycle.
//!
//! This module rehydrates transactions from stored events without proposing
//! anything, and returns read-only views.

use paylife_core::error::{DomainError, RejectionReason};
use paylife_core::event_log::{EventLog, StoredEvent};
use serde::Serialize;
use tracing::error;

use crate::domain::events::TransactionEvent;
use crate::domain::replay::{ReplayError, rehydrate};
use crate::domain::status::{TransactionId, TransactionStatus};

/// Read-only view of a transaction's current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionStatusView {
    /// The transaction identifier.
    pub transaction_id: TransactionId,
    /// Status code, e.g. `AUTHORIZATION_REQUESTED`.
    pub status: &'static str,
    /// Closure outcome code once the transaction is closed.
    pub closure_outcome: Option<&'static str>,
    /// Sequence number of the last applied event.
    pub last_sequence: i64,
    /// Whether the transaction is started but not yet closed.
    pub transient: bool,
    /// Whether an approved authorization is still open to a refund.
    pub refundable: bool,
}

impl TransactionStatusView {
    /// Builds the view for a rehydrated status.
    #[must_use]
    pub fn new(transaction_id: TransactionId, status: &TransactionStatus) -> Self {
        Self {
            transaction_id,
            status: status.status_code(),
            closure_outcome: status.closure_outcome().map(|o| o.code()),
            last_sequence: status.last_sequence(),
            transient: status.is_transient(),
            refundable: status.is_refundable(),
        }
    }
}

/// Rebuilds a transaction's status from its stored history.
///
/// # Errors
///
/// Returns `DomainError::UndecodableEvent` if a payload cannot be decoded and
/// `DomainError::CorruptedHistory` if an event belongs to another transaction
/// or cannot be applied.
pub fn rehydrate_stored(
    transaction_id: TransactionId,
    history: &[StoredEvent],
) -> Result<TransactionStatus, DomainError> {
    let corrupted = |ReplayError { sequence, reason }| {
        error!(%transaction_id, sequence, %reason, "event history cannot be replayed");
        DomainError::CorruptedHistory {
            transaction_id: transaction_id.as_uuid(),
            sequence,
            reason,
        }
    };

    let mut events = Vec::with_capacity(history.len());
    for stored in history {
        let event = TransactionEvent::from_stored(stored)?;
        if event.transaction_id() != transaction_id {
            return Err(corrupted(ReplayError {
                sequence: event.sequence(),
                reason: RejectionReason::TransactionMismatch {
                    expected: transaction_id.as_uuid(),
                    found: event.transaction_id().as_uuid(),
                },
            }));
        }
        events.push(event);
    }

    rehydrate(&events).map_err(corrupted)
}

/// Loads and rehydrates a transaction's current status. An unknown
/// transaction is [`TransactionStatus::Empty`].
///
/// # Errors
///
/// Returns `DomainError::LogUnavailable` if the history cannot be read, or
/// any error from [`rehydrate_stored`].
pub async fn load_status(
    transaction_id: TransactionId,
    log: &dyn EventLog,
) -> Result<TransactionStatus, DomainError> {
    let history = log.read_history(transaction_id.as_uuid()).await?;
    rehydrate_stored(transaction_id, &history)
}

/// Retrieves a read-only view of a transaction's status.
///
/// # Errors
///
/// Returns any error from [`load_status`].
pub async fn get_transaction_status(
    transaction_id: TransactionId,
    log: &dyn EventLog,
) -> Result<TransactionStatusView, DomainError> {
    let status = load_status(transaction_id, log).await?;
    Ok(TransactionStatusView::new(transaction_id, &status))
}
