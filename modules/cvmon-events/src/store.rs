//! PgEventLog: `cv_processing_log` and the pipeline working tables in Postgres.
//!
//! The log is append-only from this crate's point of view: the tracker inserts,
//! the report reads. Nothing here updates or deletes rows.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use cvmon_common::{FailedEvent, PipelineStatus, ReportWindow};

use crate::tracker::EventSink;
use crate::traits::{EventLogReader, PipelineStatusReader};
use crate::types::NewEvent;

#[derive(Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool holding a single connection, used for every query of one
    /// report run. Call [`close`](Self::close) when the run is done reading.
    pub async fn connect_single(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Build a pool that only connects when the first event is written.
    /// Construction never touches the network.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    /// Close every connection and wait for them to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl EventLogReader for PgEventLog {
    async fn counts_by_event_type(&self, window: &ReportWindow) -> Result<HashMap<String, u64>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT event_type, COUNT(*) AS count
            FROM cv_processing_log
            WHERE "timestamp" >= $1 AND "timestamp" < $2
            GROUP BY event_type
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        debug!(groups = rows.len(), date = %window.date, "Fetched event counts");

        Ok(rows
            .into_iter()
            .map(|(event_type, count)| (event_type, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    async fn recent_failures(&self, window: &ReportWindow, limit: u32) -> Result<Vec<FailedEvent>> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>, DateTime<Utc>)>(
            r#"
            SELECT email, event_type, error_message, "timestamp"
            FROM cv_processing_log
            WHERE "timestamp" >= $1 AND "timestamp" < $2
              AND status = 'failed'
            ORDER BY "timestamp" DESC
            LIMIT $3
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(email, event_type, error_message, timestamp)| FailedEvent {
                email,
                event_type,
                error_message,
                timestamp,
            })
            .collect())
    }
}

#[async_trait]
impl PipelineStatusReader for PgEventLog {
    async fn pipeline_status(&self) -> Result<PipelineStatus> {
        let unprocessed_cvs = count(
            &self.pool,
            "SELECT COUNT(*) FROM users WHERE is_parsed = 0 OR is_parsed IS NULL",
        )
        .await?;

        let active_batches = count(
            &self.pool,
            "SELECT COUNT(*) FROM batch_tracking
             WHERE batch_status <> 'completed'
               AND updated_at >= now() - interval '48 hours'",
        )
        .await?;

        let pending_insertions = count(
            &self.pool,
            "SELECT COUNT(*) FROM parsed_emails
             WHERE is_inserted = 0 AND parsed_data IS NOT NULL",
        )
        .await?;

        Ok(PipelineStatus {
            unprocessed_cvs,
            active_batches,
            pending_insertions,
        })
    }
}

#[async_trait]
impl EventSink for PgEventLog {
    async fn insert(&self, events: &[NewEvent]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for event in events {
            sqlx::query(
                r#"
                INSERT INTO cv_processing_log
                    ("timestamp", email, event_type, status, error_message, user_id)
                VALUES (now(), $1, $2, $3, $4, $5)
                "#,
            )
            .bind(&event.email)
            .bind(event.event_type.as_str())
            .bind(event.status.as_str())
            .bind(&event.error_message)
            .bind(&event.user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn count(pool: &PgPool, sql: &str) -> Result<u64> {
    let n = sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?;
    Ok(u64::try_from(n).unwrap_or(0))
}
