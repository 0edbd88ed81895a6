//! Domain model: statuses, events, the transition function and replay.

pub mod commands;
pub mod events;
pub mod replay;
pub mod status;
pub mod transition;
