use async_trait::async_trait;

use super::backend::NotifyBackend;
use crate::types::RenderedReport;

/// No-op notification backend for testing.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn send_report(&self, _report: &RenderedReport) -> anyhow::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
