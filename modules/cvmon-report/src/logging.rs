//! Subscriber setup for the `daily-report` binary: stderr plus a plain-text
//! log file per day under `LOG_DIR`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use cvmon_common::Config;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Stderr-only logging, used when configuration could not be loaded.
pub fn init_stderr(level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Log to stderr and append to `{log_dir}/daily_report_YYYYMMDD.log`, dated
/// in the report timezone. Returns the log file path.
pub fn init(config: &Config) -> anyhow::Result<PathBuf> {
    let now = Utc::now();
    let path = config.log_dir.join(log_file_name(now, config.report_timezone));
    let file = open_log_file(&path)?;

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(path)
}

pub fn log_file_name(now: DateTime<Utc>, tz: Tz) -> String {
    format!("daily_report_{}.log", now.with_timezone(&tz).format("%Y%m%d"))
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
