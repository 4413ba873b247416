// Test doubles for the event log.
//
// - MockSink (EventSink): records inserted rows, or fails every insert.
// - MockEventLog (EventLogReader + PipelineStatusReader): canned counts,
//   failure rows and pipeline status, with an optional forced error.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use cvmon_common::{EventType, FailedEvent, PipelineStatus, ReportWindow};

use crate::tracker::EventSink;
use crate::traits::{EventLogReader, PipelineStatusReader};
use crate::types::NewEvent;

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

pub struct MockSink {
    rows: Mutex<Vec<NewEvent>>,
    fail: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A sink whose every insert fails like a dropped connection.
    pub fn failing() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn rows(&self) -> Vec<NewEvent> {
        self.rows.lock().unwrap().clone()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for MockSink {
    async fn insert(&self, events: &[NewEvent]) -> Result<()> {
        if self.fail {
            bail!("connection refused");
        }
        self.rows.lock().unwrap().extend_from_slice(events);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockEventLog
// ---------------------------------------------------------------------------

/// In-memory log. Builder pattern: `.with_count()`, `.with_failures()`,
/// `.with_pipeline_status()`, `.failing()`, `.failing_pipeline_status()`.
pub struct MockEventLog {
    counts: HashMap<String, u64>,
    failures: Vec<FailedEvent>,
    pipeline: PipelineStatus,
    fail_with: Option<String>,
    fail_pipeline_with: Option<String>,
    requested_limits: Mutex<Vec<u32>>,
    honour_limit: bool,
}

impl MockEventLog {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            failures: Vec::new(),
            pipeline: PipelineStatus::default(),
            fail_with: None,
            fail_pipeline_with: None,
            requested_limits: Mutex::new(Vec::new()),
            honour_limit: true,
        }
    }

    pub fn with_count(mut self, event_type: EventType, count: u64) -> Self {
        self.counts.insert(event_type.as_str().to_string(), count);
        self
    }

    /// Count for an arbitrary raw event_type, including ones outside the enum.
    pub fn with_raw_count(mut self, event_type: &str, count: u64) -> Self {
        self.counts.insert(event_type.to_string(), count);
        self
    }

    /// Failure rows, expected newest first.
    pub fn with_failures(mut self, failures: Vec<FailedEvent>) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_pipeline_status(mut self, status: PipelineStatus) -> Self {
        self.pipeline = status;
        self
    }

    /// Every query errors with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// Only `pipeline_status` errors with `message`; event log queries succeed.
    pub fn failing_pipeline_status(mut self, message: &str) -> Self {
        self.fail_pipeline_with = Some(message.to_string());
        self
    }

    /// Return every failure row regardless of the requested limit.
    pub fn ignoring_limit(mut self) -> Self {
        self.honour_limit = false;
        self
    }

    /// Limits passed to `recent_failures`, in call order.
    pub fn requested_limits(&self) -> Vec<u32> {
        self.requested_limits.lock().unwrap().clone()
    }
}

impl Default for MockEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLogReader for MockEventLog {
    async fn counts_by_event_type(&self, _window: &ReportWindow) -> Result<HashMap<String, u64>> {
        if let Some(msg) = &self.fail_with {
            bail!("{msg}");
        }
        Ok(self.counts.clone())
    }

    async fn recent_failures(
        &self,
        _window: &ReportWindow,
        limit: u32,
    ) -> Result<Vec<FailedEvent>> {
        self.requested_limits.lock().unwrap().push(limit);
        if let Some(msg) = &self.fail_with {
            bail!("{msg}");
        }
        let rows = self.failures.iter().cloned();
        Ok(if self.honour_limit {
            rows.take(limit as usize).collect()
        } else {
            rows.collect()
        })
    }
}

#[async_trait]
impl PipelineStatusReader for MockEventLog {
    async fn pipeline_status(&self) -> Result<PipelineStatus> {
        if let Some(msg) = self.fail_with.as_ref().or(self.fail_pipeline_with.as_ref()) {
            bail!("{msg}");
        }
        Ok(self.pipeline)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `n` failure rows inside `window`, newest first, one minute apart.
pub fn failure_rows(window: &ReportWindow, n: usize) -> Vec<FailedEvent> {
    let newest: DateTime<Utc> = window.end - Duration::minutes(1);
    (0..n)
        .map(|i| FailedEvent {
            email: format!("candidate{i}@example.com"),
            event_type: EventType::CvParsingFailed.as_str().to_string(),
            error_message: Some(format!("Invalid JSON format (row {i})")),
            timestamp: newest - Duration::minutes(i as i64),
        })
        .collect()
}
