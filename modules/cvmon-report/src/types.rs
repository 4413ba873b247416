use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use cvmon_common::{FailedEvent, PipelineStatus};

/// Aggregated metrics for one report day. Built once by the collector and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetrics {
    pub report_date: NaiveDate,
    pub cvs_received: u64,
    pub cvs_rejected: u64,
    pub cvs_parsed_success: u64,
    pub cvs_parsing_failed: u64,
    pub cvs_insertion_failed: u64,
    pub activity_updated: u64,
    pub activity_update_failed: u64,
    /// rejected + parsing_failed + insertion_failed
    pub total_failed: u64,
    /// Percentage of completed CVs that parsed successfully.
    pub success_rate: f64,
    pub cvs_in_progress: u64,
    /// Newest first, at most the configured cap.
    pub failed_emails: Vec<FailedEvent>,
    /// More failed rows existed in the window than `failed_emails` holds.
    pub failures_truncated: bool,
}

impl fmt::Display for DailyMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "date={} received={} parsed={} rejected={} parsing_failed={} \
             insertion_failed={} total_failed={} in_progress={} success_rate={:.2}% \
             activity_updated={} activity_update_failed={}",
            self.report_date,
            self.cvs_received,
            self.cvs_parsed_success,
            self.cvs_rejected,
            self.cvs_parsing_failed,
            self.cvs_insertion_failed,
            self.total_failed,
            self.cvs_in_progress,
            self.success_rate,
            self.activity_updated,
            self.activity_update_failed,
        )
    }
}

/// Everything the renderer needs for one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub metrics: DailyMetrics,
    pub pipeline_status: PipelineStatus,
    pub generated_at: DateTime<Utc>,
}

/// Overall health banner, derived only from the success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusTier {
    Excellent,
    Good,
    NeedsAttention,
    Critical,
}

impl StatusTier {
    pub fn from_success_rate(rate: f64) -> Self {
        if rate >= 95.0 {
            Self::Excellent
        } else if rate >= 85.0 {
            Self::Good
        } else if rate >= 70.0 {
            Self::NeedsAttention
        } else {
            Self::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::NeedsAttention => "Needs Attention",
            Self::Critical => "Critical",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Excellent => "\u{1F7E2}",
            Self::Good => "\u{1F7E1}",
            Self::NeedsAttention => "\u{1F7E0}",
            Self::Critical => "\u{1F534}",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Excellent => "#28a745",
            Self::Good => "#ffc107",
            Self::NeedsAttention => "#fd7e14",
            Self::Critical => "#dc3545",
        }
    }
}

impl fmt::Display for StatusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The rendered email.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub report_date: NaiveDate,
    pub subject: String,
    pub html: String,
}

/// Stats from a report run.
#[derive(Debug)]
pub struct RunStats {
    pub report_date: NaiveDate,
    pub cvs_received: u64,
    pub cvs_parsed_success: u64,
    pub total_failed: u64,
    pub success_rate: f64,
    pub failures_listed: usize,
    pub delivered_via: &'static str,
    pub recipients: usize,
    pub duration: Duration,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "date={} received={} parsed={} total_failed={} success_rate={:.2}% \
             failures_listed={} delivered_via={} recipients={} duration={:.2}s",
            self.report_date,
            self.cvs_received,
            self.cvs_parsed_success,
            self.total_failed,
            self.success_rate,
            self.failures_listed,
            self.delivered_via,
            self.recipients,
            self.duration.as_secs_f64(),
        )
    }
}
