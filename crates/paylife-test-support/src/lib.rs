//! Shared test doubles and fixtures for the payment-transaction lifecycle
//! core.

mod fixtures;
mod log;

pub use fixtures::{FixedClock, fixed_now, stored_event, stored_history};
pub use log::{
    BarrierEventLog, ConflictingEventLog, FailingEventLog, RecordingEventLog, StallingEventLog,
};
