//! Event log abstraction.
//!
//! The log is the only shared mutable resource in the system. It is
//! append-only and its conditional append is the sole serialization point
//! for writers racing on the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, RejectionReason};
use crate::event::DomainEvent;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Transaction this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the transaction stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Captures a domain event in its persisted form.
    pub fn from_domain_event(event: &dyn DomainEvent) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload(),
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
        }
    }

    /// Checks that this event can extend `aggregate_id`'s stream whose last
    /// sequence number is `expected_last_sequence`.
    ///
    /// # Errors
    ///
    /// Returns `TransactionMismatch` if the event belongs to another stream
    /// and `SequenceGap` unless it carries `expected_last_sequence + 1`.
    pub fn check_follows(
        &self,
        aggregate_id: Uuid,
        expected_last_sequence: i64,
    ) -> Result<(), RejectionReason> {
        if self.aggregate_id != aggregate_id {
            return Err(RejectionReason::TransactionMismatch {
                expected: aggregate_id,
                found: self.aggregate_id,
            });
        }
        if expected_last_sequence.checked_add(1) != Some(self.sequence_number) {
            return Err(RejectionReason::SequenceGap {
                expected: expected_last_sequence.saturating_add(1),
                found: self.sequence_number,
            });
        }
        Ok(())
    }
}

/// Append-only event log for transaction streams.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Load the full history of a transaction, ordered by sequence number.
    /// An unknown transaction has an empty history.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::LogUnavailable` if the log cannot be read.
    async fn read_history(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append one event, provided the stream's last sequence number is still
    /// `expected_last_sequence`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Rejected` if the event does not follow the
    /// expected tail of this stream (see [`StoredEvent::check_follows`]),
    /// `DomainError::ConcurrencyConflict` if the stream has advanced or the
    /// sequence number is already taken, and `DomainError::LogUnavailable`
    /// if the log cannot be written.
    async fn append_if_sequence_matches(
        &self,
        aggregate_id: Uuid,
        expected_last_sequence: i64,
        event: &StoredEvent,
    ) -> Result<(), DomainError>;
}
