//! Deterministic clock and stored-event fixtures.
//!
//! Fixtures build events in their persisted wire form so that tests exercise
//! the same decoding path as production reads.

use chrono::{DateTime, TimeZone, Utc};
use paylife_core::command::Clock;
use paylife_core::event_log::StoredEvent;
use uuid::Uuid;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The timestamp every fixture event carries: 2026-01-15 10:00:00 UTC.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Builds one stored event.
///
/// `kind` is the snake-case event kind (`activation_requested`, `cancel`,
/// ...). The provider's answer is spelled `authorization_approved` or
/// `authorization_denied`; both persist as an `authorization_outcome` event.
#[must_use]
pub fn stored_event(aggregate_id: Uuid, sequence_number: i64, kind: &str) -> StoredEvent {
    let (event_kind, payload) = match kind {
        "authorization_approved" | "authorization_denied" => {
            let outcome = kind.trim_start_matches("authorization_");
            (
                "authorization_outcome",
                serde_json::json!({"kind": "authorization_outcome", "outcome": outcome}),
            )
        }
        other => (other, serde_json::json!({ "kind": other })),
    };

    StoredEvent {
        event_id: Uuid::new_v4(),
        aggregate_id,
        event_type: format!("transaction.{event_kind}"),
        payload,
        sequence_number,
        correlation_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        occurred_at: fixed_now(),
    }
}

/// Builds a gap-free history numbered from 1.
#[must_use]
pub fn stored_history(aggregate_id: Uuid, kinds: &[&str]) -> Vec<StoredEvent> {
    kinds
        .iter()
        .zip(1..)
        .map(|(kind, sequence_number)| stored_event(aggregate_id, sequence_number, kind))
        .collect()
}
