//! Paylife transaction aggregate.
//!
//! Reconstructs the status of a single payment transaction by replaying its
//! event history, decides the next status when a new event is proposed, and
//! appends accepted events under optimistic concurrency.

pub mod application;
pub mod domain;
