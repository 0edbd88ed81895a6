//! Domain events for the payment-transaction lifecycle.

use paylife_core::error::DomainError;
use paylife_core::event::{DomainEvent, EventMetadata};
use paylife_core::event_log::StoredEvent;
use serde::{Deserialize, Serialize};

use super::status::{AuthorizationOutcome, TransactionId};

/// Event type identifier for [`TransactionEventKind::ActivationRequested`].
pub const ACTIVATION_REQUESTED_EVENT_TYPE: &str = "transaction.activation_requested";

/// Event type identifier for [`TransactionEventKind::Activated`].
pub const ACTIVATED_EVENT_TYPE: &str = "transaction.activated";

/// Event type identifier for [`TransactionEventKind::ActivationExpired`].
pub const ACTIVATION_EXPIRED_EVENT_TYPE: &str = "transaction.activation_expired";

/// Event type identifier for [`TransactionEventKind::AuthorizationRequested`].
pub const AUTHORIZATION_REQUESTED_EVENT_TYPE: &str = "transaction.authorization_requested";

/// Event type identifier for [`TransactionEventKind::AuthorizationOutcome`].
pub const AUTHORIZATION_OUTCOME_EVENT_TYPE: &str = "transaction.authorization_outcome";

/// Event type identifier for [`TransactionEventKind::Settlement`].
pub const SETTLEMENT_EVENT_TYPE: &str = "transaction.settlement";

/// Event type identifier for [`TransactionEventKind::Close`].
pub const CLOSE_EVENT_TYPE: &str = "transaction.close";

/// Event type identifier for [`TransactionEventKind::Cancel`].
pub const CANCEL_EVENT_TYPE: &str = "transaction.cancel";

/// Event type identifier for [`TransactionEventKind::Refund`].
pub const REFUND_EVENT_TYPE: &str = "transaction.refund";

/// What happened to the transaction. Carries only the attributes the
/// transition function decides on; business payload stays in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionEventKind {
    /// A request to begin the transaction was recorded.
    ActivationRequested,
    /// The activation was confirmed.
    Activated,
    /// The activation request was not confirmed in time.
    ActivationExpired,
    /// An authorization attempt was sent to the payment provider.
    AuthorizationRequested,
    /// The payment provider answered the authorization attempt.
    AuthorizationOutcome {
        /// Approved or denied.
        outcome: AuthorizationOutcome,
    },
    /// Funds for an approved authorization were settled.
    Settlement,
    /// A denied transaction was closed.
    Close,
    /// The transaction was cancelled.
    Cancel,
    /// Funds for an approved authorization were returned.
    Refund,
}

impl TransactionEventKind {
    /// Every event kind, in lifecycle order. Both authorization outcomes are
    /// listed.
    pub const ALL: [Self; 10] = [
        Self::ActivationRequested,
        Self::Activated,
        Self::ActivationExpired,
        Self::AuthorizationRequested,
        Self::AuthorizationOutcome {
            outcome: AuthorizationOutcome::Approved,
        },
        Self::AuthorizationOutcome {
            outcome: AuthorizationOutcome::Denied,
        },
        Self::Settlement,
        Self::Close,
        Self::Cancel,
        Self::Refund,
    ];

    /// Returns the event type name for this kind.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::ActivationRequested => ACTIVATION_REQUESTED_EVENT_TYPE,
            Self::Activated => ACTIVATED_EVENT_TYPE,
            Self::ActivationExpired => ACTIVATION_EXPIRED_EVENT_TYPE,
            Self::AuthorizationRequested => AUTHORIZATION_REQUESTED_EVENT_TYPE,
            Self::AuthorizationOutcome { .. } => AUTHORIZATION_OUTCOME_EVENT_TYPE,
            Self::Settlement => SETTLEMENT_EVENT_TYPE,
            Self::Close => CLOSE_EVENT_TYPE,
            Self::Cancel => CANCEL_EVENT_TYPE,
            Self::Refund => REFUND_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for a payment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: TransactionEventKind,
}

impl TransactionEvent {
    /// The transaction this event belongs to.
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        TransactionId::new(self.metadata.aggregate_id)
    }

    /// Position of this event in its transaction's stream.
    #[must_use]
    pub fn sequence(&self) -> i64 {
        self.metadata.sequence_number
    }

    /// Decodes a persisted event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UndecodableEvent` if the payload is not a known
    /// event kind or disagrees with the stored event type.
    pub fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let undecodable = |message: String| DomainError::UndecodableEvent {
            transaction_id: stored.aggregate_id,
            sequence: stored.sequence_number,
            message,
        };

        let kind: TransactionEventKind = serde_json::from_value(stored.payload.clone())
            .map_err(|e| undecodable(format!("event deserialization failed: {e}")))?;
        if kind.event_type() != stored.event_type {
            return Err(undecodable(format!(
                "payload kind {} does not match event type {}",
                kind.event_type(),
                stored.event_type
            )));
        }

        Ok(Self {
            metadata: EventMetadata {
                event_id: stored.event_id,
                event_type: stored.event_type.clone(),
                aggregate_id: stored.aggregate_id,
                sequence_number: stored.sequence_number,
                correlation_id: stored.correlation_id,
                causation_id: stored.causation_id,
                occurred_at: stored.occurred_at,
            },
            kind,
        })
    }
}

impl DomainEvent for TransactionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(self.kind).expect("TransactionEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
