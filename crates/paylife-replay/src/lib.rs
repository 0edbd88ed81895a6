//! Paylife replay: rehydrates every transaction found in a dump of stored
//! events and reports its status.

pub mod cli;
pub mod error;
pub mod report;
