//! Append one CV processing event from a shell step.
//!
//! Always exits 0 so a logging problem can never fail the calling pipeline.
//! Prints `true` when the event was written and `false` otherwise.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cvmon_events::{EventTracker, PgEventLog, RawEvent};

#[derive(Parser)]
#[command(name = "track-event")]
#[command(about = "Record a CV processing event in cv_processing_log")]
#[command(version)]
struct Cli {
    /// Candidate email address
    #[arg(long)]
    email: String,

    /// cv_received, cv_rejected, cv_parsed_success, cv_parsing_failed,
    /// cv_insertion_failed, activity_updated or activity_update_failed
    #[arg(long)]
    event_type: String,

    /// success or failed
    #[arg(long)]
    status: String,

    /// User ID from the originating request
    #[arg(long)]
    user_id: Option<String>,

    /// Error details when status is failed
    #[arg(long)]
    error_message: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let logged = track(cli).await;

    println!("{logged}");
    ExitCode::SUCCESS
}

async fn track(cli: Cli) -> bool {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        error!(target: "event_tracker", "DATABASE_URL is not set, event not logged");
        return false;
    };

    let log = match PgEventLog::connect_lazy(&database_url) {
        Ok(log) => log,
        Err(e) => {
            error!(target: "event_tracker", error = %e, "Invalid DATABASE_URL, event not logged");
            return false;
        }
    };

    let mut raw = RawEvent::new(cli.email, cli.event_type, cli.status);
    raw.user_id = cli.user_id;
    raw.error_message = cli.error_message;

    let tracker = EventTracker::new(Arc::new(log.clone()));
    let logged = tracker.log_event(raw).await;
    log.close().await;
    logged
}
