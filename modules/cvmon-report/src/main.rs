use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use cvmon_common::{Config, CvMonError, ReportWindow};
use cvmon_report::logging;
use cvmon_report::notify::{backend::NotifyBackend, outbox::OutboxBackend, smtp::SmtpMailer};
use cvmon_report::reporter::DailyReporter;

const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "daily-report")]
#[command(about = "Email the daily CV processing report")]
#[command(version)]
struct Cli {
    /// Report on this day (YYYY-MM-DD) instead of yesterday
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Write the HTML to DATA_DIR/reports instead of sending email
    #[arg(long)]
    dry_run: bool,

    /// Log the resolved configuration with secrets masked, then exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            logging::init_stderr("info");
            error!(error = %e, "Cannot start daily report");
            return ExitCode::from(e.exit_code());
        }
    };

    match logging::init(&config) {
        Ok(path) => info!(path = %path.display(), "Daily report starting"),
        Err(e) => {
            logging::init_stderr(&config.log_level);
            warn!(error = %e, "File logging unavailable, logging to stderr only");
        }
    }

    config.log_redacted();
    if cli.print_config {
        return ExitCode::SUCCESS;
    }

    let run_id = Uuid::new_v4();
    let span = info_span!("daily_report", run_id = %run_id);

    tokio::select! {
        result = run(&config, &cli).instrument(span) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Daily report failed");
                ExitCode::from(e.exit_code())
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!(run_id = %run_id, "Interrupted, daily report aborted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(config: &Config, cli: &Cli) -> Result<(), CvMonError> {
    let window = match cli.date {
        Some(date) => ReportWindow::for_date(date, config.report_timezone)?,
        None => ReportWindow::previous_day(Utc::now(), config.report_timezone)?,
    };

    let notifier: Box<dyn NotifyBackend> = if cli.dry_run {
        info!(data_dir = %config.data_dir.display(), "Dry run, report goes to the outbox");
        Box::new(OutboxBackend::new(&config.data_dir))
    } else {
        let mailer = SmtpMailer::from_config(config)
            .map_err(|e| CvMonError::Config(format!("{e:#}")))?;
        Box::new(mailer)
    };

    let reporter = DailyReporter::from_config(config, notifier)?;
    reporter.run(&window).await?;
    Ok(())
}
