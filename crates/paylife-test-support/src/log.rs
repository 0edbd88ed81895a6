//! Test event logs: mock `EventLog` implementations for tests.

use std::future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use paylife_core::error::DomainError;
use paylife_core::event_log::{EventLog, StoredEvent};
use tokio::sync::Barrier;
use uuid::Uuid;

/// An event log that returns a fixed history from every `read_history`
/// call, accepts every append, and records what was appended.
#[derive(Debug)]
pub struct RecordingEventLog {
    history: Vec<StoredEvent>,
    reads: AtomicUsize,
    appended: Mutex<Vec<(Uuid, i64, StoredEvent)>>,
}

impl RecordingEventLog {
    /// Create a log that will return `history` from every read.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self {
            history,
            reads: AtomicUsize::new(0),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all `(aggregate_id, expected_last_sequence,
    /// event)` appends.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, StoredEvent)> {
        self.appended.lock().unwrap().clone()
    }

    /// Number of `read_history` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventLog for RecordingEventLog {
    async fn read_history(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.history.clone())
    }

    async fn append_if_sequence_matches(
        &self,
        aggregate_id: Uuid,
        expected_last_sequence: i64,
        event: &StoredEvent,
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_last_sequence, event.clone()));
        Ok(())
    }
}

/// An event log that always returns an unavailable error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventLog;

#[async_trait]
impl EventLog for FailingEventLog {
    async fn read_history(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::LogUnavailable("connection refused".into()))
    }

    async fn append_if_sequence_matches(
        &self,
        _aggregate_id: Uuid,
        _expected_last_sequence: i64,
        _event: &StoredEvent,
    ) -> Result<(), DomainError> {
        Err(DomainError::LogUnavailable("connection refused".into()))
    }
}

/// An event log whose first `conflicts` appends lose a race to a phantom
/// writer. Later appends succeed. The history never changes.
#[derive(Debug)]
pub struct ConflictingEventLog {
    history: Vec<StoredEvent>,
    conflicts: usize,
    attempts: AtomicUsize,
}

impl ConflictingEventLog {
    /// Create a log returning `history` whose first `conflicts` appends fail.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>, conflicts: usize) -> Self {
        Self {
            history,
            conflicts,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of append attempts so far, failed or not.
    pub fn append_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventLog for ConflictingEventLog {
    async fn read_history(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.history.clone())
    }

    async fn append_if_sequence_matches(
        &self,
        aggregate_id: Uuid,
        expected_last_sequence: i64,
        _event: &StoredEvent,
    ) -> Result<(), DomainError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.conflicts {
            return Err(DomainError::ConcurrencyConflict {
                transaction_id: aggregate_id,
                expected: expected_last_sequence,
                actual: expected_last_sequence + 1,
            });
        }
        Ok(())
    }
}

/// An event log that never answers reads, or never answers appends. Used
/// to exercise timeouts.
#[derive(Debug)]
pub struct StallingEventLog {
    history: Option<Vec<StoredEvent>>,
}

impl StallingEventLog {
    /// Every read hangs.
    #[must_use]
    pub fn stall_reads() -> Self {
        Self { history: None }
    }

    /// Reads return `history`; every append hangs.
    #[must_use]
    pub fn stall_appends(history: Vec<StoredEvent>) -> Self {
        Self {
            history: Some(history),
        }
    }
}

#[async_trait]
impl EventLog for StallingEventLog {
    async fn read_history(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        match &self.history {
            Some(history) => Ok(history.clone()),
            None => future::pending().await,
        }
    }

    async fn append_if_sequence_matches(
        &self,
        _aggregate_id: Uuid,
        _expected_last_sequence: i64,
        _event: &StoredEvent,
    ) -> Result<(), DomainError> {
        future::pending().await
    }
}

/// Wraps a real log so that every read waits until `parties` readers have
/// loaded their history. Lets a test force concurrent submitters to all see
/// the same tail before any of them appends.
pub struct BarrierEventLog {
    inner: Arc<dyn EventLog>,
    barrier: Barrier,
}

impl BarrierEventLog {
    /// Gate reads of `inner` behind a barrier of `parties` readers.
    #[must_use]
    pub fn new(inner: Arc<dyn EventLog>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
        }
    }
}

impl std::fmt::Debug for BarrierEventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarrierEventLog").finish_non_exhaustive()
    }
}

#[async_trait]
impl EventLog for BarrierEventLog {
    async fn read_history(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let history = self.inner.read_history(aggregate_id).await;
        self.barrier.wait().await;
        history
    }

    async fn append_if_sequence_matches(
        &self,
        aggregate_id: Uuid,
        expected_last_sequence: i64,
        event: &StoredEvent,
    ) -> Result<(), DomainError> {
        self.inner
            .append_if_sequence_matches(aggregate_id, expected_last_sequence, event)
            .await
    }
}
