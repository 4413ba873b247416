use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use super::backend::NotifyBackend;
use crate::types::RenderedReport;

/// Dry-run delivery: writes the report HTML to `{data_dir}/reports/{date}.html`
/// instead of emailing it. A rerun for the same date overwrites the file.
pub struct OutboxBackend {
    dir: PathBuf,
}

impl OutboxBackend {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("reports"),
        }
    }

    pub fn path_for(&self, report_date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.html", report_date.format("%Y-%m-%d")))
    }
}

#[async_trait]
impl NotifyBackend for OutboxBackend {
    async fn send_report(&self, report: &RenderedReport) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create outbox {}", self.dir.display()))?;

        let path = self.path_for(report.report_date);
        tokio::fs::write(&path, report.html.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(
            path = %path.display(),
            subject = report.subject.as_str(),
            "Report written to outbox"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "outbox"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(html: &str) -> RenderedReport {
        RenderedReport {
            report_date: NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            subject: "Daily CV Processing Report - 2026-02-06".to_string(),
            html: html.to_string(),
        }
    }

    #[tokio::test]
    async fn writes_dated_file_under_reports() {
        let tmp = tempfile::tempdir().unwrap();
        let outbox = OutboxBackend::new(tmp.path());

        outbox.send_report(&report("<html>first</html>")).await.unwrap();
        outbox.send_report(&report("<html>second</html>")).await.unwrap();

        let path = tmp.path().join("reports").join("2026-02-06.html");
        assert_eq!(outbox.path_for(report("").report_date), path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html>second</html>");
    }

    #[tokio::test]
    async fn unwritable_outbox_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let outbox = OutboxBackend::new(&blocker);
        assert!(outbox.send_report(&report("<html></html>")).await.is_err());
    }
}
