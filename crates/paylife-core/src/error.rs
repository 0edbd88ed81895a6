//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Why the transition function refused an event.
///
/// Rejections are deterministic: re-applying the same event to the same
/// status always fails the same way, so they are never retried as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RejectionReason {
    /// The event kind is not legal for the current status.
    #[error("illegal transition: {kind} is not accepted in status {status}")]
    IllegalTransition {
        /// Status code of the status the event was applied to.
        status: &'static str,
        /// Event type of the rejected event.
        kind: &'static str,
    },

    /// The transaction is already closed.
    #[error("transaction is closed; no further events are accepted")]
    TerminalState,

    /// The event does not immediately follow the last applied sequence number.
    #[error("sequence gap: expected sequence {expected}, found {found}")]
    SequenceGap {
        /// The only sequence number the status would accept.
        expected: i64,
        /// The sequence number carried by the event.
        found: i64,
    },

    /// The event belongs to a different transaction.
    #[error("event for transaction {found} applied to transaction {expected}")]
    TransactionMismatch {
        /// The transaction the status belongs to.
        expected: Uuid,
        /// The transaction named by the event.
        found: Uuid,
    },
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A proposed event was rejected by the transition function.
    #[error("event rejected: {0}")]
    Rejected(#[from] RejectionReason),

    /// The stored history cannot be replayed. Fatal for the transaction.
    #[error("corrupted history for transaction {transaction_id} at sequence {sequence}: {reason}")]
    CorruptedHistory {
        /// The transaction whose log is corrupted.
        transaction_id: Uuid,
        /// Sequence number of the offending event.
        sequence: i64,
        /// Why the offending event could not be applied.
        reason: RejectionReason,
    },

    /// A stored event payload could not be decoded.
    #[error("undecodable event for transaction {transaction_id} at sequence {sequence}: {message}")]
    UndecodableEvent {
        /// The transaction the event belongs to.
        transaction_id: Uuid,
        /// Sequence number of the offending event.
        sequence: i64,
        /// Decoder error message.
        message: String,
    },

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on transaction {transaction_id}: expected last sequence {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The transaction that had the conflict.
        transaction_id: Uuid,
        /// The tail sequence observed at load time.
        expected: i64,
        /// The tail sequence the log actually holds.
        actual: i64,
    },

    /// The event log could not be read or written.
    #[error("event log unavailable: {0}")]
    LogUnavailable(String),

    /// An append timed out; the event may or may not have been stored.
    #[error("append outcome unknown for transaction {transaction_id} at sequence {sequence}")]
    AppendOutcomeUnknown {
        /// The transaction the append targeted.
        transaction_id: Uuid,
        /// Sequence number of the event whose append timed out.
        sequence: i64,
    },
}

impl DomainError {
    /// Returns `true` if the operation may succeed after re-reading fresh
    /// state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::LogUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_and_log_failures_are_retryable() {
        let id = Uuid::new_v4();

        assert!(
            DomainError::ConcurrencyConflict {
                transaction_id: id,
                expected: 2,
                actual: 3,
            }
            .is_retryable()
        );
        assert!(DomainError::LogUnavailable("connection refused".into()).is_retryable());

        assert!(!DomainError::Rejected(RejectionReason::TerminalState).is_retryable());
        assert!(
            !DomainError::Rejected(RejectionReason::SequenceGap {
                expected: 3,
                found: 5,
            })
            .is_retryable()
        );
        assert!(
            !DomainError::AppendOutcomeUnknown {
                transaction_id: id,
                sequence: 3,
            }
            .is_retryable()
        );
        assert!(
            !DomainError::CorruptedHistory {
                transaction_id: id,
                sequence: 2,
                reason: RejectionReason::TerminalState,
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_sequence_gap_message_names_both_sequences() {
        let err = DomainError::from(RejectionReason::SequenceGap {
            expected: 3,
            found: 7,
        });

        assert_eq!(
            err.to_string(),
            "event rejected: sequence gap: expected sequence 3, found 7"
        );
    }
}
