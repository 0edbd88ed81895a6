//! Application layer: the aggregate handle and its supporting policies.

pub mod aggregate_handle;
pub mod config;
pub mod query_handlers;
pub mod retry;
