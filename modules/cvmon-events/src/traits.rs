// Read-side query seams for the daily report.
//
// PgEventLog implements both against Postgres; testing::MockEventLog
// implements them in memory so aggregation can be tested without a database.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use cvmon_common::{FailedEvent, PipelineStatus, ReportWindow};

#[async_trait]
pub trait EventLogReader: Send + Sync {
    /// Event counts grouped by raw `event_type` within the window.
    async fn counts_by_event_type(&self, window: &ReportWindow) -> Result<HashMap<String, u64>>;

    /// The newest `limit` failed events within the window, newest first.
    async fn recent_failures(&self, window: &ReportWindow, limit: u32) -> Result<Vec<FailedEvent>>;
}

#[async_trait]
pub trait PipelineStatusReader: Send + Sync {
    /// Current backlog counts from the pipeline's working tables.
    async fn pipeline_status(&self) -> Result<PipelineStatus>;
}
