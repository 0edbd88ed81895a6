//! Process-local implementation of the `EventLog` trait.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use paylife_core::error::DomainError;
use paylife_core::event_log::{EventLog, StoredEvent};
use tracing::debug;
use uuid::Uuid;

/// In-memory event log. The mutex only guards the map; the compare of the
/// expected tail and the push happen under one lock, which is the
/// compare-and-swap every writer races on.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    streams: Mutex<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn streams(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Vec<StoredEvent>>>, DomainError> {
        self.streams
            .lock()
            .map_err(|_| DomainError::LogUnavailable("in-memory event log lock poisoned".into()))
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn read_history(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .streams()?
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_if_sequence_matches(
        &self,
        aggregate_id: Uuid,
        expected_last_sequence: i64,
        event: &StoredEvent,
    ) -> Result<(), DomainError> {
        event.check_follows(aggregate_id, expected_last_sequence)?;

        let mut streams = self.streams()?;
        let stream = streams.entry(aggregate_id).or_default();

        let actual = stream.last().map_or(0, |e| e.sequence_number);
        if actual != expected_last_sequence {
            debug!(%aggregate_id, expected_last_sequence, actual, "conditional append refused");
            return Err(DomainError::ConcurrencyConflict {
                transaction_id: aggregate_id,
                expected: expected_last_sequence,
                actual,
            });
        }

        stream.push(event.clone());
        Ok(())
    }
}
