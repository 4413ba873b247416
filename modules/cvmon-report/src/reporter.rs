use std::time::Instant;

use tracing::{error, info, warn};

use cvmon_common::{Config, CvMonError, ReportWindow};
use cvmon_events::{EventLogReader, PgEventLog, PipelineStatusReader};

use crate::collector::MetricsCollector;
use crate::notify::backend::NotifyBackend;
use crate::render::ReportRenderer;
use crate::types::{ReportData, RunStats};

/// One daily report run: collect, render, deliver.
pub struct DailyReporter {
    database_url: String,
    collector: MetricsCollector,
    renderer: ReportRenderer,
    notifier: Box<dyn NotifyBackend>,
}

impl DailyReporter {
    pub fn new(
        database_url: String,
        collector: MetricsCollector,
        renderer: ReportRenderer,
        notifier: Box<dyn NotifyBackend>,
    ) -> Self {
        Self {
            database_url,
            collector,
            renderer,
            notifier,
        }
    }

    pub fn from_config(
        config: &Config,
        notifier: Box<dyn NotifyBackend>,
    ) -> Result<Self, CvMonError> {
        Ok(Self::new(
            config.database_url.clone(),
            MetricsCollector::from_config(config),
            ReportRenderer::from_config(config)?,
            notifier,
        ))
    }

    /// Run against Postgres. Opens one connection, collects, and closes it
    /// before rendering whether or not collection succeeded.
    pub async fn run(&self, window: &ReportWindow) -> Result<RunStats, CvMonError> {
        let started = Instant::now();

        let store = PgEventLog::connect_single(&self.database_url)
            .await
            .map_err(|e| {
                error!(error = %e, "Database connection failed");
                CvMonError::Collection(format!("database connection: {e:#}"))
            })?;

        let collected = self.collector.collect(&store, &store, window).await;

        // Always release the connection
        store.close().await;

        self.deliver(collected?, started).await
    }

    /// Run against arbitrary readers.
    pub async fn run_with(
        &self,
        reader: &dyn EventLogReader,
        status_reader: &dyn PipelineStatusReader,
        window: &ReportWindow,
    ) -> Result<RunStats, CvMonError> {
        let started = Instant::now();
        let data = self.collector.collect(reader, status_reader, window).await?;
        self.deliver(data, started).await
    }

    async fn deliver(&self, data: ReportData, started: Instant) -> Result<RunStats, CvMonError> {
        let report = self.renderer.render(&data)?;
        info!(subject = report.subject.as_str(), bytes = report.html.len(), "Report rendered");

        if let Err(e) = self.notifier.send_report(&report).await {
            warn!(backend = self.notifier.name(), error = %e, "Report delivery failed");
            return Err(CvMonError::Notify(format!("{e:#}")));
        }

        let m = &data.metrics;
        let stats = RunStats {
            report_date: m.report_date,
            cvs_received: m.cvs_received,
            cvs_parsed_success: m.cvs_parsed_success,
            total_failed: m.total_failed,
            success_rate: m.success_rate,
            failures_listed: m.failed_emails.len(),
            delivered_via: self.notifier.name(),
            recipients: self.notifier.recipient_count(),
            duration: started.elapsed(),
        };

        info!("Daily report complete. {stats}");
        Ok(stats)
    }
}
