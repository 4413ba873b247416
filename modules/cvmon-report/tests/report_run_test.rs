//! Report runs against the in-memory event log with a recording notifier.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use cvmon_common::{CvMonError, EventType, PipelineStatus, ReportWindow};
use cvmon_events::testing::{failure_rows, MockEventLog};
use cvmon_report::collector::MetricsCollector;
use cvmon_report::notify::backend::NotifyBackend;
use cvmon_report::notify::noop::NoopBackend;
use cvmon_report::notify::outbox::OutboxBackend;
use cvmon_report::render::ReportRenderer;
use cvmon_report::reporter::DailyReporter;
use cvmon_report::types::RenderedReport;

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<RenderedReport>>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<RenderedReport> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifyBackend for RecordingNotifier {
    async fn send_report(&self, report: &RenderedReport) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("535 authentication failed");
        }
        self.sent.lock().unwrap().push(report.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }

    fn recipient_count(&self) -> usize {
        3
    }
}

fn window() -> ReportWindow {
    ReportWindow::for_date(
        NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
        chrono_tz::Asia::Kolkata,
    )
    .unwrap()
}

fn reporter(notifier: Box<dyn NotifyBackend>, cap: u32) -> DailyReporter {
    DailyReporter::new(
        "postgres://127.0.0.1:1/cvmon_unreachable".to_string(),
        MetricsCollector::new(cap),
        ReportRenderer::new("Daily CV Processing Report", chrono_tz::Asia::Kolkata).unwrap(),
        notifier,
    )
}

fn busy_day(w: &ReportWindow) -> MockEventLog {
    MockEventLog::new()
        .with_count(EventType::CvReceived, 100)
        .with_count(EventType::CvParsedSuccess, 90)
        .with_count(EventType::CvRejected, 3)
        .with_count(EventType::CvParsingFailed, 4)
        .with_count(EventType::CvInsertionFailed, 3)
        .with_failures(failure_rows(w, 10))
        .with_pipeline_status(PipelineStatus {
            unprocessed_cvs: 1500,
            active_batches: 3,
            pending_insertions: 250,
        })
}

#[tokio::test]
async fn successful_run_sends_exactly_one_report() {
    let w = window();
    let log = busy_day(&w);
    let notifier = RecordingNotifier::default();

    let stats = reporter(Box::new(notifier.clone()), 5)
        .run_with(&log, &log, &w)
        .await
        .unwrap();

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Daily CV Processing Report - 2026-02-06");
    assert!(sent[0].html.contains("Overall Status: Good"));
    assert!(sent[0].html.contains("92.8% Success Rate"));
    assert!(sent[0].html.contains("candidate4@example.com"));
    assert!(!sent[0].html.contains("candidate5@example.com"));

    assert_eq!(stats.report_date, w.date);
    assert_eq!(stats.total_failed, 10);
    assert_eq!(stats.failures_listed, 5);
    assert_eq!(stats.delivered_via, "recording");
    assert_eq!(stats.recipients, 3);
}

#[tokio::test]
async fn collection_failure_sends_nothing() {
    let log = MockEventLog::new().failing("server closed the connection unexpectedly");
    let notifier = RecordingNotifier::default();

    let err = reporter(Box::new(notifier.clone()), 50)
        .run_with(&log, &log, &window())
        .await
        .unwrap_err();

    assert!(err.is_collection());
    assert_eq!(err.exit_code(), 1);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn unreachable_database_sends_nothing() {
    let notifier = RecordingNotifier::default();

    let err = reporter(Box::new(notifier.clone()), 50)
        .run(&window())
        .await
        .unwrap_err();

    assert!(matches!(err, CvMonError::Collection(_)));
    assert!(err.to_string().starts_with("Metrics collection failed"));
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn pipeline_status_failure_sends_nothing() {
    let w = window();
    let log = busy_day(&w).failing_pipeline_status("permission denied for table users");
    let notifier = RecordingNotifier::default();

    let err = reporter(Box::new(notifier.clone()), 50)
        .run_with(&log, &log, &w)
        .await
        .unwrap_err();

    assert!(matches!(err, CvMonError::Collection(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn delivery_failure_is_a_notify_error() {
    let w = window();
    let log = busy_day(&w);

    let err = reporter(Box::new(RecordingNotifier::failing()), 50)
        .run_with(&log, &log, &w)
        .await
        .unwrap_err();

    assert!(matches!(err, CvMonError::Notify(_)));
    assert!(err.to_string().contains("535 authentication failed"));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn quiet_day_reports_no_failures() {
    let w = window();
    let log = MockEventLog::new().with_count(EventType::CvReceived, 12);
    let notifier = RecordingNotifier::default();

    let stats = reporter(Box::new(notifier.clone()), 50)
        .run_with(&log, &log, &w)
        .await
        .unwrap();

    assert_eq!(stats.success_rate, 100.0);
    assert!(notifier.sent()[0].html.contains("No failures recorded on 2026-02-06"));
}

#[tokio::test]
async fn dry_run_writes_to_outbox() {
    let tmp = tempfile::tempdir().unwrap();
    let w = window();
    let log = busy_day(&w);

    let stats = reporter(Box::new(OutboxBackend::new(tmp.path())), 50)
        .run_with(&log, &log, &w)
        .await
        .unwrap();

    let html = std::fs::read_to_string(tmp.path().join("reports/2026-02-06.html")).unwrap();
    assert!(html.contains("Daily CV Processing Report - 2026-02-06"));
    assert_eq!(stats.delivered_via, "outbox");
    assert_eq!(stats.recipients, 0);
}

#[tokio::test]
async fn noop_backend_completes() {
    let w = window();
    let log = busy_day(&w);

    let stats = reporter(Box::new(NoopBackend), 50)
        .run_with(&log, &log, &w)
        .await
        .unwrap();

    assert_eq!(stats.delivered_via, "noop");
    assert_eq!(stats.failures_listed, 10);
}
