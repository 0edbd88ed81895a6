//! Rehydration of an event log dump, one report per transaction.

use std::collections::BTreeMap;
use std::path::Path;

use paylife_core::event_log::StoredEvent;
use paylife_transaction::application::query_handlers::{TransactionStatusView, rehydrate_stored};
use paylife_transaction::domain::status::TransactionId;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};

/// Result of rehydrating one transaction found in the dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReport {
    /// The transaction the events belong to.
    pub transaction_id: Uuid,
    /// Number of events found for it.
    pub event_count: usize,
    /// The rehydrated view or the reason replay failed.
    #[serde(flatten)]
    pub outcome: ReportOutcome,
}

/// Either a view or an error, serialized under `view` or `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The history replayed cleanly.
    View(TransactionStatusView),
    /// The history could not be replayed.
    Error(ErrorBody),
}

impl TransactionReport {
    /// Returns `true` if the history replayed cleanly.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ReportOutcome::View(_))
    }
}

/// Reads a JSON array of stored events.
///
/// # Errors
///
/// Returns `AppError::Io` if the file cannot be read and `AppError::Parse`
/// if it is not a JSON array of stored events.
pub async fn read_dump(path: &Path) -> Result<Vec<StoredEvent>, AppError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Groups a dump by transaction and rehydrates each one independently.
///
/// Events are ordered by sequence number within a transaction; a dump does
/// not have to be sorted. Reports come back ordered by transaction id.
#[must_use]
pub fn replay_dump(events: Vec<StoredEvent>) -> Vec<TransactionReport> {
    let mut streams: BTreeMap<Uuid, Vec<StoredEvent>> = BTreeMap::new();
    for event in events {
        streams.entry(event.aggregate_id).or_default().push(event);
    }

    streams
        .into_iter()
        .map(|(transaction_id, mut history)| {
            history.sort_by_key(|e| e.sequence_number);
            let outcome = match rehydrate_stored(TransactionId::new(transaction_id), &history) {
                Ok(status) => {
                    info!(%transaction_id, %status, "transaction rehydrated");
                    ReportOutcome::View(TransactionStatusView::new(
                        TransactionId::new(transaction_id),
                        &status,
                    ))
                }
                Err(err) => {
                    warn!(%transaction_id, error = %err, "transaction could not be rehydrated");
                    ReportOutcome::Error(ErrorBody::from(&err))
                }
            };
            TransactionReport {
                transaction_id,
                event_count: history.len(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use paylife_test_support::{stored_event, stored_history};
    use uuid::Uuid;

    use super::{ReportOutcome, replay_dump};

    #[test]
    fn test_replay_dump_reports_each_transaction() {
        // Arrange
        let settled = Uuid::from_u128(1);
        let open = Uuid::from_u128(2);
        let mut dump = stored_history(
            settled,
            &[
                "activation_requested",
                "activated",
                "authorization_requested",
                "authorization_approved",
                "settlement",
            ],
        );
        dump.extend(stored_history(open, &["activation_requested", "activated"]));

        // Act
        let reports = replay_dump(dump);

        // Assert
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].transaction_id, settled);
        assert_eq!(reports[0].event_count, 5);
        match &reports[0].outcome {
            ReportOutcome::View(view) => {
                assert_eq!(view.status, "CLOSED");
                assert_eq!(view.closure_outcome, Some("SETTLED"));
            }
            ReportOutcome::Error(body) => panic!("unexpected error {body:?}"),
        }
        match &reports[1].outcome {
            ReportOutcome::View(view) => {
                assert_eq!(view.status, "ACTIVATED");
                assert!(view.transient);
            }
            ReportOutcome::Error(body) => panic!("unexpected error {body:?}"),
        }
    }

    #[test]
    fn test_replay_dump_orders_events_by_sequence() {
        // Arrange
        let id = Uuid::new_v4();
        let dump = vec![
            stored_event(id, 2, "activated"),
            stored_event(id, 1, "activation_requested"),
        ];

        // Act
        let reports = replay_dump(dump);

        // Assert
        assert!(reports[0].is_ok());
    }

    #[test]
    fn test_replay_dump_reports_corrupted_history_without_stopping() {
        // Arrange
        let broken = Uuid::from_u128(1);
        let healthy = Uuid::from_u128(2);
        let mut dump = vec![
            stored_event(broken, 1, "activation_requested"),
            stored_event(broken, 3, "activated"),
        ];
        dump.extend(stored_history(healthy, &["cancel"]));

        // Act
        let reports = replay_dump(dump);

        // Assert
        match &reports[0].outcome {
            ReportOutcome::Error(body) => assert_eq!(body.error, "corrupted_history"),
            ReportOutcome::View(view) => panic!("unexpected view {view:?}"),
        }
        assert!(reports[1].is_ok());
    }

    #[test]
    fn test_report_serializes_view_under_its_own_key() {
        // Arrange
        let id = Uuid::from_u128(3);
        let reports = replay_dump(stored_history(id, &["activation_requested"]));

        // Act
        let json = serde_json::to_value(&reports[0]).unwrap();

        // Assert
        assert_eq!(json["event_count"], 1);
        assert_eq!(json["view"]["status"], "ACTIVATION_REQUESTED");
        assert!(json.get("error").is_none());
    }
}
