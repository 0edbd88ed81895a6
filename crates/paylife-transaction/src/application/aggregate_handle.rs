//! Aggregate handle: the unit of concurrency control for one transaction.
//!
//! Each submission loads the history, rehydrates, validates the proposed
//! event, and appends it conditioned on the tail sequence read at load time.
//! No in-process locking is performed; the log's conditional append decides
//! which of several racing writers wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use paylife_core::command::{Clock, Command};
use paylife_core::error::{DomainError, RejectionReason};
use paylife_core::event::EventMetadata;
use paylife_core::event_log::{EventLog, StoredEvent};
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use super::config::HandleConfig;
use super::query_handlers::rehydrate_stored;
use super::retry::retry_retryable;
use crate::domain::commands::RecordTransactionEvent;
use crate::domain::events::TransactionEvent;
use crate::domain::status::{TransactionId, TransactionStatus};
use crate::domain::transition;

/// Submits events for transactions against an [`EventLog`].
#[derive(Clone)]
pub struct AggregateHandle {
    log: Arc<dyn EventLog>,
    config: HandleConfig,
}

impl std::fmt::Debug for AggregateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateHandle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AggregateHandle {
    /// Creates a handle over `log`.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>, config: HandleConfig) -> Self {
        Self { log, config }
    }

    /// The configuration this handle runs with.
    #[must_use]
    pub fn config(&self) -> &HandleConfig {
        &self.config
    }

    /// Rehydrates the current status of a transaction.
    ///
    /// Also the way to resolve an `AppendOutcomeUnknown`: re-read, then
    /// decide whether the event still needs to be submitted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::LogUnavailable` if the read fails or times out,
    /// and `CorruptedHistory`/`UndecodableEvent` if the history is damaged.
    #[instrument(skip(self), fields(transaction_id = %transaction_id))]
    pub async fn load(&self, transaction_id: TransactionId) -> Result<TransactionStatus, DomainError> {
        let history = self.read_history(transaction_id).await?;
        rehydrate_stored(transaction_id, &history)
    }

    /// Validates `proposed` against the current status and appends it.
    ///
    /// The event must carry the sequence number that immediately follows the
    /// transaction's last event. On success the returned status is the
    /// result of one incremental transition, not a second replay.
    ///
    /// # Errors
    ///
    /// - `DomainError::Rejected` if the transition function refuses the
    ///   event; never retry as-is.
    /// - `DomainError::ConcurrencyConflict` if another writer appended first;
    ///   re-read and retry with a fresh sequence number.
    /// - `DomainError::AppendOutcomeUnknown` if the append timed out; re-read
    ///   before deciding to retry.
    /// - `DomainError::LogUnavailable`, `CorruptedHistory` or
    ///   `UndecodableEvent` from loading.
    #[instrument(
        skip(self, proposed),
        fields(
            transaction_id = %transaction_id,
            sequence = proposed.sequence(),
            event_type = proposed.kind.event_type(),
        )
    )]
    pub async fn submit(
        &self,
        transaction_id: TransactionId,
        proposed: TransactionEvent,
    ) -> Result<TransactionStatus, DomainError> {
        if proposed.transaction_id() != transaction_id {
            return Err(DomainError::Rejected(RejectionReason::TransactionMismatch {
                expected: transaction_id.as_uuid(),
                found: proposed.transaction_id().as_uuid(),
            }));
        }

        let current = self.load(transaction_id).await?;
        self.append_next(current, &proposed).await
    }

    /// Handles a [`RecordTransactionEvent`] command: stamps the event with
    /// the next sequence number of freshly rehydrated state and submits it,
    /// retrying conflicts and log outages per the configured policy.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`AggregateHandle::submit`]; retryable
    /// ones only after the retry budget is spent.
    #[instrument(
        skip(self, command, clock),
        fields(
            transaction_id = %command.transaction_id,
            correlation_id = %command.correlation_id,
            command_type = command.command_type(),
        )
    )]
    pub async fn execute(
        &self,
        command: &RecordTransactionEvent,
        clock: &dyn Clock,
    ) -> Result<TransactionStatus, DomainError> {
        let handle = self;
        retry_retryable(&self.config.retry, move || handle.execute_once(command, clock)).await
    }

    async fn execute_once(
        &self,
        command: &RecordTransactionEvent,
        clock: &dyn Clock,
    ) -> Result<TransactionStatus, DomainError> {
        let current = self.load(command.transaction_id).await?;
        let event = TransactionEvent {
            metadata: EventMetadata::for_command(
                command.kind.event_type(),
                command.aggregate_id(),
                current.next_sequence(),
                command.correlation_id(),
                clock.now(),
            ),
            kind: command.kind,
        };
        self.append_next(current, &event).await
    }

    async fn append_next(
        &self,
        current: TransactionStatus,
        event: &TransactionEvent,
    ) -> Result<TransactionStatus, DomainError> {
        let next = transition::apply(current, event)?;

        let stored = StoredEvent::from_domain_event(event);
        let transaction_id = event.transaction_id();
        let appended = bounded(
            self.config.append_timeout,
            self.log.append_if_sequence_matches(
                transaction_id.as_uuid(),
                current.last_sequence(),
                &stored,
            ),
        )
        .await;

        match appended {
            Some(Ok(())) => {
                info!(
                    %transaction_id,
                    sequence = event.sequence(),
                    status = next.status_code(),
                    "transaction event appended"
                );
                Ok(next)
            }
            Some(Err(err @ DomainError::ConcurrencyConflict { .. })) => {
                warn!(%transaction_id, error = %err, "lost append race");
                Err(err)
            }
            Some(Err(err)) => Err(err),
            None => {
                warn!(
                    %transaction_id,
                    sequence = event.sequence(),
                    "append timed out; outcome unknown"
                );
                Err(DomainError::AppendOutcomeUnknown {
                    transaction_id: transaction_id.as_uuid(),
                    sequence: event.sequence(),
                })
            }
        }
    }

    async fn read_history(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        bounded(
            self.config.read_timeout,
            self.log.read_history(transaction_id.as_uuid()),
        )
        .await
        .unwrap_or_else(|| {
            Err(DomainError::LogUnavailable(format!(
                "reading history of {transaction_id} timed out after {:?}",
                self.config.read_timeout
            )))
        })
    }
}

/// Runs a log call under `limit`; `None` means it timed out.
async fn bounded<T>(limit: Duration, call: impl Future<Output = T>) -> Option<T> {
    timeout(limit, call).await.ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use paylife_core::error::{DomainError, RejectionReason};
    use paylife_core::event::EventMetadata;
    use paylife_test_support::{
        ConflictingEventLog, FailingEventLog, FixedClock, RecordingEventLog, StallingEventLog,
        stored_history,
    };
    use uuid::Uuid;

    use super::AggregateHandle;
    use crate::application::config::HandleConfig;
    use crate::application::retry::RetryPolicy;
    use crate::domain::commands::RecordTransactionEvent;
    use crate::domain::events::{TransactionEvent, TransactionEventKind};
    use crate::domain::status::{AuthorizationOutcome, ClosureOutcome, TransactionId};

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn fast_config(max_retries: usize) -> HandleConfig {
        HandleConfig {
            read_timeout: Duration::from_millis(200),
            append_timeout: Duration::from_millis(200),
            retry: RetryPolicy::builder()
                .max_retries(max_retries)
                .initial_delay(Duration::from_millis(1))
                .build(),
        }
    }

    fn proposed(id: TransactionId, sequence: i64, kind: TransactionEventKind) -> TransactionEvent {
        TransactionEvent {
            metadata: EventMetadata::for_command(
                kind.event_type(),
                id.as_uuid(),
                sequence,
                Uuid::new_v4(),
                fixed_clock().0,
            ),
            kind,
        }
    }

    #[tokio::test]
    async fn test_submit_appends_with_expected_tail_sequence() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(RecordingEventLog::new(stored_history(
            id.as_uuid(),
            &["activation_requested", "activated"],
        )));
        let handle = AggregateHandle::new(log.clone(), fast_config(0));

        // Act
        let status = handle
            .submit(id, proposed(id, 3, TransactionEventKind::AuthorizationRequested))
            .await
            .unwrap();

        // Assert
        assert_eq!(status.status_code(), "AUTHORIZATION_REQUESTED");
        assert_eq!(status.last_sequence(), 3);

        let appended = log.appended_events();
        assert_eq!(appended.len(), 1);
        let (agg_id, expected_last_sequence, stored) = &appended[0];
        assert_eq!(*agg_id, id.as_uuid());
        assert_eq!(*expected_last_sequence, 2);
        assert_eq!(stored.sequence_number, 3);
        assert_eq!(stored.event_type, "transaction.authorization_requested");
    }

    #[tokio::test]
    async fn test_submit_activated_against_empty_is_illegal_and_not_appended() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(RecordingEventLog::new(Vec::new()));
        let handle = AggregateHandle::new(log.clone(), fast_config(0));

        // Act
        let result = handle
            .submit(id, proposed(id, 1, TransactionEventKind::Activated))
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::Rejected(RejectionReason::IllegalTransition {
                status: "EMPTY",
                ..
            }))
        ));
        assert!(log.appended_events().is_empty());
    }

    #[tokio::test]
    async fn test_submit_with_stale_sequence_is_a_sequence_gap() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(RecordingEventLog::new(stored_history(
            id.as_uuid(),
            &["activation_requested", "activated"],
        )));
        let handle = AggregateHandle::new(log.clone(), fast_config(0));

        // Act
        let result = handle
            .submit(id, proposed(id, 2, TransactionEventKind::Cancel))
            .await;

        // Assert
        match result {
            Err(DomainError::Rejected(RejectionReason::SequenceGap { expected, found })) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected SequenceGap, got {other:?}"),
        }
        assert!(log.appended_events().is_empty());
    }

    #[tokio::test]
    async fn test_submit_after_closure_is_terminal() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(RecordingEventLog::new(stored_history(
            id.as_uuid(),
            &["activation_requested", "cancel"],
        )));
        let handle = AggregateHandle::new(log, fast_config(0));

        // Act
        let result = handle
            .submit(id, proposed(id, 3, TransactionEventKind::Activated))
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::Rejected(RejectionReason::TerminalState))
        ));
    }

    #[tokio::test]
    async fn test_submit_rejects_event_for_another_transaction() {
        // Arrange
        let id = TransactionId::generate();
        let other = TransactionId::generate();
        let handle = AggregateHandle::new(Arc::new(RecordingEventLog::new(Vec::new())), fast_config(0));

        // Act
        let result = handle
            .submit(id, proposed(other, 1, TransactionEventKind::ActivationRequested))
            .await;

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::Rejected(RejectionReason::TransactionMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_submit_surfaces_log_conflict_as_concurrency_conflict() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(ConflictingEventLog::new(
            stored_history(id.as_uuid(), &["activation_requested"]),
            usize::MAX,
        ));
        let handle = AggregateHandle::new(log, fast_config(0));

        // Act
        let result = handle
            .submit(id, proposed(id, 2, TransactionEventKind::Activated))
            .await;

        // Assert
        match result {
            Err(DomainError::ConcurrencyConflict {
                transaction_id,
                expected,
                ..
            }) => {
                assert_eq!(transaction_id, id.as_uuid());
                assert_eq!(expected, 1);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_append_timeout_is_unknown_outcome() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(StallingEventLog::stall_appends(stored_history(
            id.as_uuid(),
            &["activation_requested"],
        )));
        let handle = AggregateHandle::new(log, fast_config(3));

        // Act
        let result = handle
            .submit(id, proposed(id, 2, TransactionEventKind::Activated))
            .await;

        // Assert
        match result {
            Err(DomainError::AppendOutcomeUnknown {
                transaction_id,
                sequence,
            }) => {
                assert_eq!(transaction_id, id.as_uuid());
                assert_eq!(sequence, 2);
            }
            other => panic!("expected AppendOutcomeUnknown, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_read_timeout_is_log_unavailable() {
        // Arrange
        let handle = AggregateHandle::new(Arc::new(StallingEventLog::stall_reads()), fast_config(0));

        // Act
        let result = handle.load(TransactionId::generate()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::LogUnavailable(_))));
    }

    #[tokio::test]
    async fn test_execute_stamps_next_sequence_and_clock_time() {
        // Arrange
        let id = TransactionId::generate();
        let correlation_id = Uuid::new_v4();
        let clock = fixed_clock();
        let log = Arc::new(RecordingEventLog::new(stored_history(
            id.as_uuid(),
            &[
                "activation_requested",
                "activated",
                "authorization_requested",
            ],
        )));
        let handle = AggregateHandle::new(log.clone(), fast_config(0));
        let command = RecordTransactionEvent {
            correlation_id,
            transaction_id: id,
            kind: TransactionEventKind::AuthorizationOutcome {
                outcome: AuthorizationOutcome::Approved,
            },
        };

        // Act
        let status = handle.execute(&command, &clock).await.unwrap();

        // Assert
        assert_eq!(status.status_code(), "AUTHORIZATION_COMPLETED");

        let appended = log.appended_events();
        assert_eq!(appended.len(), 1);
        let (_, expected_last_sequence, stored) = &appended[0];
        assert_eq!(*expected_last_sequence, 3);
        assert_eq!(stored.sequence_number, 4);
        assert_eq!(stored.correlation_id, correlation_id);
        assert_eq!(stored.causation_id, correlation_id);
        assert_eq!(stored.occurred_at, clock.0);
        assert_eq!(
            stored.payload,
            serde_json::json!({"kind": "authorization_outcome", "outcome": "approved"})
        );
    }

    #[tokio::test]
    async fn test_execute_retries_conflicts_then_succeeds() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(ConflictingEventLog::new(
            stored_history(id.as_uuid(), &["activation_requested"]),
            2,
        ));
        let handle = AggregateHandle::new(log.clone(), fast_config(3));
        let command = RecordTransactionEvent {
            correlation_id: Uuid::new_v4(),
            transaction_id: id,
            kind: TransactionEventKind::ActivationExpired,
        };

        // Act
        let status = handle.execute(&command, &fixed_clock()).await.unwrap();

        // Assert
        assert_eq!(status.closure_outcome(), Some(ClosureOutcome::Expired));
        assert_eq!(log.append_attempts(), 3);
    }

    #[tokio::test]
    async fn test_execute_gives_up_after_retry_budget() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(ConflictingEventLog::new(
            stored_history(id.as_uuid(), &["activation_requested"]),
            usize::MAX,
        ));
        let handle = AggregateHandle::new(log.clone(), fast_config(2));
        let command = RecordTransactionEvent {
            correlation_id: Uuid::new_v4(),
            transaction_id: id,
            kind: TransactionEventKind::Activated,
        };

        // Act
        let result = handle.execute(&command, &fixed_clock()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::ConcurrencyConflict { .. })));
        assert_eq!(log.append_attempts(), 3);
    }

    #[tokio::test]
    async fn test_execute_does_not_retry_rejections() {
        // Arrange
        let id = TransactionId::generate();
        let log = Arc::new(RecordingEventLog::new(Vec::new()));
        let handle = AggregateHandle::new(log.clone(), fast_config(3));
        let command = RecordTransactionEvent {
            correlation_id: Uuid::new_v4(),
            transaction_id: id,
            kind: TransactionEventKind::Settlement,
        };

        // Act
        let result = handle.execute(&command, &fixed_clock()).await;

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::Rejected(RejectionReason::IllegalTransition { .. }))
        ));
        assert_eq!(log.read_count(), 1);
    }

    #[tokio::test]
    async fn test_execute_reports_log_unavailable_after_retries() {
        // Arrange
        let handle = AggregateHandle::new(Arc::new(FailingEventLog), fast_config(2));
        let command = RecordTransactionEvent {
            correlation_id: Uuid::new_v4(),
            transaction_id: TransactionId::generate(),
            kind: TransactionEventKind::ActivationRequested,
        };

        // Act
        let result = handle.execute(&command, &fixed_clock()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::LogUnavailable(_))));
    }
}
