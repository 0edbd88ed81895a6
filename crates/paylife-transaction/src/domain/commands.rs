//! Commands for the payment-transaction lifecycle.

use paylife_core::command::Command;
use uuid::Uuid;

use super::events::TransactionEventKind;
use super::status::TransactionId;

/// Command to record that something happened to a transaction. The
/// aggregate handle assigns the sequence number from freshly rehydrated
/// state, so the command itself never goes stale.
#[derive(Debug, Clone, Copy)]
pub struct RecordTransactionEvent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The transaction the event belongs to.
    pub transaction_id: TransactionId,
    /// What happened.
    pub kind: TransactionEventKind,
}

impl Command for RecordTransactionEvent {
    fn command_type(&self) -> &'static str {
        "transaction.record_event"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn aggregate_id(&self) -> Uuid {
        self.transaction_id.as_uuid()
    }
}
