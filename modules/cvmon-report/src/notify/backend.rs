use async_trait::async_trait;

use crate::types::RenderedReport;

/// Pluggable delivery backend for the rendered daily report.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    /// Deliver one rendered report. Errors are not retried.
    async fn send_report(&self, report: &RenderedReport) -> anyhow::Result<()>;

    /// Short name for logs and run stats.
    fn name(&self) -> &'static str;

    /// Number of mailboxes a successful send reaches.
    fn recipient_count(&self) -> usize {
        0
    }
}
