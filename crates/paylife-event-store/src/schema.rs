//! Event log database schema.

/// SQL to create the transaction events table, taken from the first
/// migration. The unique constraint on `(aggregate_id, sequence_number)` is
/// what guarantees at most one event per sequence number per transaction.
pub const CREATE_TRANSACTION_EVENTS_TABLE: &str =
    include_str!("../../../migrations/0001_create_transaction_events.sql");

#[cfg(test)]
mod tests {
    use super::CREATE_TRANSACTION_EVENTS_TABLE;

    #[test]
    fn test_schema_is_idempotent_and_unique_per_sequence() {
        assert!(CREATE_TRANSACTION_EVENTS_TABLE.contains("CREATE TABLE IF NOT EXISTS transaction_events"));
        assert!(CREATE_TRANSACTION_EVENTS_TABLE.contains("UNIQUE (aggregate_id, sequence_number)"));
        assert!(CREATE_TRANSACTION_EVENTS_TABLE.contains("CREATE INDEX IF NOT EXISTS"));
    }
}
