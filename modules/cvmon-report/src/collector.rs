//! Metrics aggregation for the daily report.
//!
//! Turns grouped event counts into the report's derived counters. The only
//! rules with any subtlety are the success rate, which is defined over
//! completed CVs, and the in-progress count, which never goes below zero.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use tracing::{error, info};

use cvmon_common::{Config, CvMonError, EventType, FailedEvent, ReportWindow};
use cvmon_events::{EventLogReader, PipelineStatusReader};

use crate::types::{DailyMetrics, ReportData};

pub struct MetricsCollector {
    max_failed_emails: u32,
}

impl MetricsCollector {
    /// `max_failed_emails` caps the failure detail rows carried in the report.
    pub fn new(max_failed_emails: u32) -> Self {
        Self { max_failed_emails }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_failed_emails)
    }

    /// Aggregate the event log for `window`. Any store error is returned as
    /// `CvMonError::Collection`; nothing is zero-filled on failure.
    ///
    /// One failure row beyond the cap is requested so the report can tell a
    /// cut list from a complete one.
    pub async fn collect_metrics(
        &self,
        reader: &dyn EventLogReader,
        window: &ReportWindow,
    ) -> Result<DailyMetrics, CvMonError> {
        let counts = reader
            .counts_by_event_type(window)
            .await
            .map_err(|e| collection_failed("event counts", e))?;

        let failures = reader
            .recent_failures(window, self.max_failed_emails.saturating_add(1))
            .await
            .map_err(|e| collection_failed("failed events", e))?;

        Ok(aggregate(window.date, &counts, failures, self.max_failed_emails))
    }

    /// Metrics plus the current pipeline backlog.
    pub async fn collect(
        &self,
        reader: &dyn EventLogReader,
        status_reader: &dyn PipelineStatusReader,
        window: &ReportWindow,
    ) -> Result<ReportData, CvMonError> {
        info!(
            date = %window.date,
            start = %window.start,
            end = %window.end,
            "Collecting metrics for daily report"
        );

        let metrics = self.collect_metrics(reader, window).await?;

        let pipeline_status = status_reader
            .pipeline_status()
            .await
            .map_err(|e| collection_failed("pipeline status", e))?;

        info!("Metrics collected. {metrics}");
        info!("Pipeline status. {pipeline_status}");

        Ok(ReportData {
            metrics,
            pipeline_status,
            generated_at: Utc::now(),
        })
    }
}

fn collection_failed(what: &str, e: anyhow::Error) -> CvMonError {
    error!(error = %e, "Error collecting {what}");
    CvMonError::Collection(format!("{what}: {e:#}"))
}

/// Build [`DailyMetrics`] from grouped counts and failure rows.
///
/// Counts are keyed by raw `event_type`; keys outside [`EventType`] are
/// ignored. `failures` is truncated to `cap` rows, and `failures_truncated`
/// records whether anything was dropped.
pub fn aggregate(
    report_date: NaiveDate,
    counts: &HashMap<String, u64>,
    mut failures: Vec<FailedEvent>,
    cap: u32,
) -> DailyMetrics {
    let count = |t: EventType| counts.get(t.as_str()).copied().unwrap_or(0);

    let cvs_received = count(EventType::CvReceived);
    let cvs_rejected = count(EventType::CvRejected);
    let cvs_parsed_success = count(EventType::CvParsedSuccess);
    let cvs_parsing_failed = count(EventType::CvParsingFailed);
    let cvs_insertion_failed = count(EventType::CvInsertionFailed);

    let total_failed = cvs_rejected + cvs_parsing_failed + cvs_insertion_failed;

    // Counts can span inconsistent windows (received yesterday, parsed today).
    let cvs_in_progress = cvs_received
        .saturating_sub(cvs_parsed_success)
        .saturating_sub(total_failed);

    let failures_truncated = failures.len() > cap as usize;
    failures.truncate(cap as usize);

    DailyMetrics {
        report_date,
        cvs_received,
        cvs_rejected,
        cvs_parsed_success,
        cvs_parsing_failed,
        cvs_insertion_failed,
        activity_updated: count(EventType::ActivityUpdated),
        activity_update_failed: count(EventType::ActivityUpdateFailed),
        total_failed,
        success_rate: success_rate(
            cvs_received,
            cvs_parsed_success,
            cvs_parsing_failed,
            cvs_insertion_failed,
        ),
        cvs_in_progress,
        failed_emails: failures,
        failures_truncated,
    }
}

/// Success rate over completed CVs only. Rejections happen before processing
/// starts and are not part of the denominator.
///
/// With nothing completed yet, CVs that were received are still in flight,
/// not failed, so the rate is 100. With nothing received either it is 0.
pub fn success_rate(
    received: u64,
    parsed: u64,
    parsing_failed: u64,
    insertion_failed: u64,
) -> f64 {
    let completed = parsed + parsing_failed + insertion_failed;
    if completed > 0 {
        parsed as f64 / completed as f64 * 100.0
    } else if received > 0 {
        100.0
    } else {
        0.0
    }
}
