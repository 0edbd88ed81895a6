//! Event log adapters for the payment-transaction lifecycle core.
//!
//! Both adapters enforce the same contract: history is returned in sequence
//! order, and an append succeeds only if the stream's last sequence number
//! still equals the caller's expectation.

pub mod in_memory;
pub mod pg_event_log;
pub mod schema;

pub use in_memory::InMemoryEventLog;
pub use pg_event_log::PgEventLog;
