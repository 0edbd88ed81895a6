//! Paylife Core: shared abstractions for the payment-transaction lifecycle.
//!
//! This crate defines the error taxonomy, event envelope, and the event log
//! seam that the transaction aggregate depends on. It contains no
//! infrastructure code.

pub mod command;
pub mod error;
pub mod event;
pub mod event_log;
