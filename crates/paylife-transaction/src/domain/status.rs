//! The closed set of statuses a payment transaction can occupy.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of one payment transaction; the unit of replay
/// isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Wraps an existing identifier.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh, time-ordered identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for TransactionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome returned by the payment provider for an authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationOutcome {
    /// The provider approved the payment.
    Approved,
    /// The provider denied the payment.
    Denied,
}

impl AuthorizationOutcome {
    /// Maps the provider's approved flag to an outcome.
    #[must_use]
    pub const fn from_approved(approved: bool) -> Self {
        if approved {
            Self::Approved
        } else {
            Self::Denied
        }
    }

    /// Returns `true` for [`AuthorizationOutcome::Approved`].
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// How a closed transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureOutcome {
    /// Funds were settled after an approved authorization.
    Settled,
    /// Activation was never confirmed in time.
    Expired,
    /// The transaction was cancelled before or without authorization.
    Cancelled,
    /// The provider denied the authorization.
    AuthorizationDenied,
    /// An approved authorization was refunded.
    Refunded,
}

impl ClosureOutcome {
    /// Stable upper-snake code for this outcome.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Settled => "SETTLED",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
            Self::AuthorizationDenied => "AUTHORIZATION_DENIED",
            Self::Refunded => "REFUNDED",
        }
    }
}

/// Where a transaction's stream stands: its identity and the last applied
/// sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamPosition {
    /// The transaction the stream belongs to.
    pub transaction_id: TransactionId,
    /// Sequence number of the last applied event.
    pub last_sequence: i64,
}

/// Current status of a payment transaction.
///
/// Values are immutable; advancing a transaction means producing a new
/// status from the previous one and an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionStatus {
    /// No events applied yet. Never persisted.
    Empty,
    /// Activation has been requested but not confirmed.
    ActivationRequested(StreamPosition),
    /// The transaction is active and may request authorization.
    Activated(StreamPosition),
    /// An authorization attempt is in flight with the provider.
    AuthorizationRequested(StreamPosition),
    /// The provider has answered the authorization attempt.
    AuthorizationCompleted {
        /// Stream position after the outcome event.
        position: StreamPosition,
        /// The provider's answer.
        outcome: AuthorizationOutcome,
    },
    /// Terminal: the transaction's outcome is final.
    Closed {
        /// Stream position after the closing event.
        position: StreamPosition,
        /// How the transaction ended.
        outcome: ClosureOutcome,
    },
}

impl TransactionStatus {
    /// Stream position, or `None` for [`TransactionStatus::Empty`].
    #[must_use]
    pub const fn position(&self) -> Option<StreamPosition> {
        match self {
            Self::Empty => None,
            Self::ActivationRequested(position)
            | Self::Activated(position)
            | Self::AuthorizationRequested(position)
            | Self::AuthorizationCompleted { position, .. }
            | Self::Closed { position, .. } => Some(*position),
        }
    }

    /// The transaction this status belongs to, once known.
    #[must_use]
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.position().map(|p| p.transaction_id)
    }

    /// Sequence number of the last applied event; `0` when empty.
    #[must_use]
    pub fn last_sequence(&self) -> i64 {
        self.position().map_or(0, |p| p.last_sequence)
    }

    /// The only sequence number the next event may carry. Saturates at
    /// `i64::MAX`; a stream positioned there accepts no further event.
    #[must_use]
    pub fn next_sequence(&self) -> i64 {
        self.last_sequence().saturating_add(1)
    }

    /// Stable upper-snake code for this status.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::ActivationRequested(_) => "ACTIVATION_REQUESTED",
            Self::Activated(_) => "ACTIVATED",
            Self::AuthorizationRequested(_) => "AUTHORIZATION_REQUESTED",
            Self::AuthorizationCompleted { .. } => "AUTHORIZATION_COMPLETED",
            Self::Closed { .. } => "CLOSED",
        }
    }

    /// Returns `true` once the transaction is closed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Returns `true` for statuses a transaction should not linger in:
    /// anything started but not yet closed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Empty | Self::Closed { .. })
    }

    /// Returns `true` if the provider approved the authorization and the
    /// funds have been neither settled nor returned; exactly the statuses
    /// that accept a refund event.
    #[must_use]
    pub const fn is_refundable(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationCompleted {
                outcome: AuthorizationOutcome::Approved,
                ..
            }
        )
    }

    /// How the transaction ended, if it has.
    #[must_use]
    pub const fn closure_outcome(&self) -> Option<ClosureOutcome> {
        match self {
            Self::Closed { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorizationCompleted { outcome, .. } => {
                write!(f, "{} ({outcome:?})", self.status_code())
            }
            Self::Closed { outcome, .. } => write!(f, "{} ({})", self.status_code(), outcome.code()),
            _ => f.write_str(self.status_code()),
        }
    }
}
