//! HTML rendering for the daily report email.
//!
//! The template is embedded at compile time and rendered with tera. All
//! formatting (thousands separators, title-cased event names, truncated
//! error messages, local timestamps) happens here so the template only
//! places values.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use tera::{Context, Tera};

use cvmon_common::{Config, CvMonError, EventType, FailedEvent};

use crate::types::{RenderedReport, ReportData, StatusTier};

const TEMPLATE_NAME: &str = "daily_report.html";
const TEMPLATE: &str = include_str!("../templates/daily_report.html");

const MAX_ERROR_CHARS: usize = 100;
const NO_DETAILS: &str = "No details available";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ReportRenderer {
    tera: Tera,
    subject_prefix: String,
    timezone: Tz,
}

#[derive(Serialize)]
struct TierView {
    label: &'static str,
    emoji: &'static str,
    color: &'static str,
}

#[derive(Serialize)]
struct BreakdownRow {
    label: &'static str,
    count: u64,
}

#[derive(Serialize)]
struct FailureRow {
    email: String,
    event: String,
    error: String,
    time: String,
}

impl ReportRenderer {
    pub fn new(subject_prefix: impl Into<String>, timezone: Tz) -> Result<Self, CvMonError> {
        let mut tera = Tera::default();
        // The ".html" suffix keeps tera's autoescaping on for every value.
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
            .map_err(|e| render_error("Invalid report template", e))?;
        tera.register_filter("thousands", thousands_filter);

        Ok(Self {
            tera,
            subject_prefix: subject_prefix.into(),
            timezone,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CvMonError> {
        Self::new(config.report_subject_prefix.clone(), config.report_timezone)
    }

    pub fn subject(&self, report_date: NaiveDate) -> String {
        format!("{} - {}", self.subject_prefix, report_date.format("%Y-%m-%d"))
    }

    pub fn render(&self, data: &ReportData) -> Result<RenderedReport, CvMonError> {
        let m = &data.metrics;
        let (success_rate, shown_rate) = displayed_rate(m.success_rate);
        let tier = StatusTier::from_success_rate(shown_rate);
        let subject = self.subject(m.report_date);

        let failures: Vec<FailureRow> = m
            .failed_emails
            .iter()
            .map(|f| self.failure_row(f))
            .collect();

        let mut ctx = Context::new();
        ctx.insert("subject", &subject);
        ctx.insert("report_date", &m.report_date.format("%Y-%m-%d").to_string());
        ctx.insert(
            "tier",
            &TierView {
                label: tier.label(),
                emoji: tier.emoji(),
                color: tier.color(),
            },
        );
        ctx.insert("success_rate", &success_rate);
        ctx.insert("m", m);
        ctx.insert(
            "breakdown",
            &[
                BreakdownRow {
                    label: "Rejected (Validation)",
                    count: m.cvs_rejected,
                },
                BreakdownRow {
                    label: "Parsing Failed",
                    count: m.cvs_parsing_failed,
                },
                BreakdownRow {
                    label: "Insertion Failed",
                    count: m.cvs_insertion_failed,
                },
            ],
        );
        ctx.insert("failures_truncated", &m.failures_truncated);
        ctx.insert("failures", &failures);
        ctx.insert("pipeline", &data.pipeline_status);
        ctx.insert("generated_at", &self.local_time(data.generated_at));

        let html = self
            .tera
            .render(TEMPLATE_NAME, &ctx)
            .map_err(|e| render_error("Failed to render daily report", e))?;

        Ok(RenderedReport {
            report_date: m.report_date,
            subject,
            html,
        })
    }

    fn failure_row(&self, f: &FailedEvent) -> FailureRow {
        FailureRow {
            email: f.email.clone(),
            event: EventType::display_label(&f.event_type),
            error: f
                .error_message
                .as_deref()
                .filter(|e| !e.is_empty())
                .map(|e| truncate(e, MAX_ERROR_CHARS))
                .unwrap_or_else(|| NO_DETAILS.to_string()),
            time: self.local_time(f.timestamp),
        }
    }

    fn local_time(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.timezone).format(TIMESTAMP_FORMAT).to_string()
    }
}

/// The rate as printed in the banner, and that printed value as a number.
/// The tier is taken from the printed value so the two always agree.
fn displayed_rate(rate: f64) -> (String, f64) {
    let shown = format!("{rate:.1}");
    let value = shown.parse().unwrap_or(rate);
    (shown, value)
}

fn render_error(context: &str, e: tera::Error) -> CvMonError {
    CvMonError::Render(format!("{context}: {:#}", anyhow::Error::new(e)))
}

/// Keep at most `max` characters, marking the cut with "...".
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Integer with comma thousands separators: 1234567 -> "1,234,567".
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn thousands_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value.as_u64() {
        Some(n) => Ok(Value::String(format_thousands(n))),
        None => Err(tera::Error::msg(format!(
            "thousands filter expects a non-negative integer, got {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cvmon_common::PipelineStatus;

    use crate::collector::aggregate;

    fn renderer() -> ReportRenderer {
        ReportRenderer::new("Daily CV Processing Report", chrono_tz::Asia::Kolkata).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 6).unwrap()
    }

    fn data(counts: &[(EventType, u64)], failures: Vec<FailedEvent>) -> ReportData {
        let counts: HashMap<String, u64> = counts
            .iter()
            .map(|(t, n)| (t.as_str().to_string(), *n))
            .collect();
        ReportData {
            metrics: aggregate(date(), &counts, failures, 50),
            pipeline_status: PipelineStatus {
                unprocessed_cvs: 1500,
                active_batches: 3,
                pending_insertions: 250,
            },
            generated_at: Utc.with_ymd_and_hms(2026, 2, 7, 3, 0, 0).unwrap(),
        }
    }

    fn failure(error_message: Option<&str>) -> FailedEvent {
        FailedEvent {
            email: "jane@example.com".to_string(),
            event_type: "cv_parsing_failed".to_string(),
            error_message: error_message.map(str::to_string),
            timestamp: Utc.with_ymd_and_hms(2026, 2, 6, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn subject_has_prefix_and_date() {
        assert_eq!(
            renderer().subject(date()),
            "Daily CV Processing Report - 2026-02-06"
        );
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 100), "short");
        let long = "é".repeat(150);
        let cut = truncate(&long, 100);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate(&"x".repeat(100), 100), "x".repeat(100));
    }

    #[test]
    fn renders_summary_and_tier() {
        let report = renderer()
            .render(&data(
                &[
                    (EventType::CvReceived, 1200),
                    (EventType::CvParsedSuccess, 1000),
                    (EventType::CvParsingFailed, 20),
                ],
                vec![failure(Some("Timeout"))],
            ))
            .unwrap();

        assert_eq!(report.subject, "Daily CV Processing Report - 2026-02-06");
        assert!(report.html.contains("1,200"));
        assert!(report.html.contains("1,500"));
        // 1000 / 1020
        assert!(report.html.contains("98.0% Success Rate"));
        assert!(report.html.contains("Overall Status: Excellent"));
        assert!(report.html.contains("#28a745"));
        assert!(report.html.contains("Cv Parsing Failed"));
        // 10:00 UTC is 15:30 in Kolkata.
        assert!(report.html.contains("2026-02-06 15:30:00"));
        assert!(report.html.contains("2026-02-07 08:30:00"));
        assert!(!report.html.contains("No failures recorded"));
    }

    #[test]
    fn critical_tier_when_most_fail() {
        let report = renderer()
            .render(&data(
                &[(EventType::CvParsedSuccess, 1), (EventType::CvInsertionFailed, 3)],
                Vec::new(),
            ))
            .unwrap();
        assert!(report.html.contains("Overall Status: Critical"));
        assert!(report.html.contains("25.0% Success Rate"));
    }

    #[test]
    fn no_failures_notice() {
        let report = renderer()
            .render(&data(&[(EventType::CvReceived, 5)], Vec::new()))
            .unwrap();
        assert!(report.html.contains("No failures recorded on 2026-02-06"));
        assert!(!report.html.contains("Failed CV Details"));
    }

    #[test]
    fn missing_and_long_errors() {
        let long = "x".repeat(150);
        let report = renderer()
            .render(&data(
                &[(EventType::CvParsingFailed, 2)],
                vec![failure(None), failure(Some(&long))],
            ))
            .unwrap();
        assert!(report.html.contains(NO_DETAILS));
        assert!(report.html.contains(&format!("{}...", "x".repeat(100))));
        assert!(!report.html.contains(&"x".repeat(101)));
    }

    #[test]
    fn values_are_html_escaped() {
        let mut f = failure(Some("<script>alert(1)</script>"));
        f.email = "<b>@example.com".to_string();
        let report = renderer()
            .render(&data(&[(EventType::CvParsingFailed, 1)], vec![f]))
            .unwrap();
        assert!(!report.html.contains("<script>"));
        assert!(report.html.contains("&lt;script&gt;"));
        assert!(report.html.contains("&lt;b&gt;@example.com"));
    }

    #[test]
    fn notes_when_failure_list_was_cut_at_cap() {
        // Activity failures are listed alongside CV failures, so the list can
        // be cut even though the CV failure counters are small.
        let mut rows: Vec<FailedEvent> = (0..10)
            .map(|i| FailedEvent {
                email: format!("active{i}@example.com"),
                event_type: "activity_update_failed".to_string(),
                error_message: Some("stale session".to_string()),
                timestamp: Utc.with_ymd_and_hms(2026, 2, 6, 12, 0, 0).unwrap(),
            })
            .collect();
        rows.extend((0..3).map(|_| failure(Some("Invalid JSON format"))));
        let counts = HashMap::from([
            (EventType::CvParsingFailed.as_str().to_string(), 3),
            (EventType::ActivityUpdateFailed.as_str().to_string(), 10),
        ]);

        let report = renderer()
            .render(&ReportData {
                metrics: aggregate(date(), &counts, rows, 5),
                pipeline_status: PipelineStatus::default(),
                generated_at: Utc.with_ymd_and_hms(2026, 2, 7, 3, 0, 0).unwrap(),
            })
            .unwrap();

        assert_eq!(report.html.matches("Activity Update Failed").count(), 5);
        assert!(report.html.contains("Showing the 5 most recent failures"));
    }

    #[test]
    fn no_cut_note_when_every_failure_is_listed() {
        let report = renderer()
            .render(&data(
                &[(EventType::CvParsingFailed, 75)],
                vec![failure(Some("boom"))],
            ))
            .unwrap();
        assert!(report.html.contains("boom"));
        assert!(!report.html.contains("most recent failures"));
    }

    #[test]
    fn tier_follows_the_printed_rate() {
        // 949 / 999 = 94.99...% prints as 95.0 and is shown as Excellent.
        let report = renderer()
            .render(&data(
                &[
                    (EventType::CvParsedSuccess, 949),
                    (EventType::CvParsingFailed, 50),
                ],
                Vec::new(),
            ))
            .unwrap();
        assert!(report.html.contains("95.0% Success Rate"));
        assert!(report.html.contains("Overall Status: Excellent"));

        assert_eq!(displayed_rate(94.94), ("94.9".to_string(), 94.9));
    }
}
