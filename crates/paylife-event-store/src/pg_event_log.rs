//! `PostgreSQL` implementation of the `EventLog` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paylife_core::error::DomainError;
use paylife_core::event_log::{EventLog, StoredEvent};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::schema::CREATE_TRANSACTION_EVENTS_TABLE;

const SELECT_HISTORY: &str = r"
SELECT event_id, aggregate_id, event_type, payload, sequence_number,
       correlation_id, causation_id, occurred_at
FROM transaction_events
WHERE aggregate_id = $1
ORDER BY sequence_number ASC
";

const SELECT_TAIL: &str = r"
SELECT COALESCE(MAX(sequence_number), 0)
FROM transaction_events
WHERE aggregate_id = $1
";

const INSERT_EVENT: &str = r"
INSERT INTO transaction_events
    (event_id, aggregate_id, event_type, payload, sequence_number,
     correlation_id, causation_id, occurred_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
";

/// PostgreSQL-backed event log.
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    /// Creates a new `PgEventLog`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the events table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::LogUnavailable` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(CREATE_TRANSACTION_EVENTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

fn unavailable(err: sqlx::Error) -> DomainError {
    DomainError::LogUnavailable(err.to_string())
}

fn row_to_stored_event(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    Ok(StoredEvent {
        event_id: row.try_get::<Uuid, _>("event_id")?,
        aggregate_id: row.try_get::<Uuid, _>("aggregate_id")?,
        event_type: row.try_get::<String, _>("event_type")?,
        payload: row.try_get::<serde_json::Value, _>("payload")?,
        sequence_number: row.try_get::<i64, _>("sequence_number")?,
        correlation_id: row.try_get::<Uuid, _>("correlation_id")?,
        causation_id: row.try_get::<Uuid, _>("causation_id")?,
        occurred_at: row.try_get::<DateTime<Utc>, _>("occurred_at")?,
    })
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn read_history(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(SELECT_HISTORY)
            .bind(aggregate_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter()
            .map(row_to_stored_event)
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable)
    }

    async fn append_if_sequence_matches(
        &self,
        aggregate_id: Uuid,
        expected_last_sequence: i64,
        event: &StoredEvent,
    ) -> Result<(), DomainError> {
        event.check_follows(aggregate_id, expected_last_sequence)?;

        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let actual: i64 = sqlx::query_scalar(SELECT_TAIL)
            .bind(aggregate_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(unavailable)?;
        if actual != expected_last_sequence {
            debug!(%aggregate_id, expected_last_sequence, actual, "stream tail has moved");
            return Err(DomainError::ConcurrencyConflict {
                transaction_id: aggregate_id,
                expected: expected_last_sequence,
                actual,
            });
        }

        let inserted = sqlx::query(INSERT_EVENT)
            .bind(event.event_id)
            .bind(aggregate_id)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.sequence_number)
            .bind(event.correlation_id)
            .bind(event.causation_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await;

        match inserted {
            Ok(_) => {}
            // A concurrent writer committed the same sequence number after our
            // tail read.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                warn!(%aggregate_id, sequence = event.sequence_number, "duplicate sequence number");
                return Err(DomainError::ConcurrencyConflict {
                    transaction_id: aggregate_id,
                    expected: expected_last_sequence,
                    actual: event.sequence_number,
                });
            }
            Err(err) => return Err(unavailable(err)),
        }

        tx.commit().await.map_err(unavailable)
    }
}
