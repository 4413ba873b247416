use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;
use tracing::info;

use crate::error::CvMonError;

const DEFAULT_SUBJECT_PREFIX: &str = "Daily CV Processing Report";
const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_MAX_FAILED_EMAILS: u32 = 50;

/// Application configuration loaded from environment variables.
///
/// Built once at startup and passed by reference to each component.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres (event log + pipeline tables)
    pub database_url: String,

    // SMTP
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,

    // Addresses
    pub email_from: String,
    pub email_to: String,
    pub email_cc: Vec<String>,
    pub email_bcc: Vec<String>,

    // Report
    pub report_subject_prefix: String,
    pub report_timezone: Tz,
    pub max_failed_emails: u32,

    // Logging and output
    pub log_dir: PathBuf,
    pub log_level: String,
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, CvMonError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Empty values count
    /// as missing. Every missing required key is reported in one error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CvMonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut required = |key: &'static str| {
            get(key).unwrap_or_else(|| {
                missing.push(key);
                String::new()
            })
        };

        let database_url = required("DATABASE_URL");
        let smtp_host = required("SMTP_HOST");
        let smtp_user = required("SMTP_USER");
        let smtp_password = required("SMTP_PASSWORD");
        let email_from = required("EMAIL_FROM");
        let email_to = required("EMAIL_TO");

        if !missing.is_empty() {
            return Err(CvMonError::Config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )));
        }

        let smtp_port = match get("SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| {
                    CvMonError::Config(format!("SMTP_PORT must be a port number, got '{raw}'"))
                })?,
            None => DEFAULT_SMTP_PORT,
        };

        let report_timezone = match get("REPORT_TIMEZONE") {
            Some(raw) => raw
                .trim()
                .parse::<Tz>()
                .map_err(|_| {
                    CvMonError::Config(format!(
                        "REPORT_TIMEZONE is not a known timezone: '{raw}'"
                    ))
                })?,
            None => DEFAULT_TIMEZONE,
        };

        let max_failed_emails = match get("MAX_FAILED_EMAILS_IN_REPORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                CvMonError::Config(format!(
                    "MAX_FAILED_EMAILS_IN_REPORT must be a non-negative integer, got '{raw}'"
                ))
            })?,
            None => DEFAULT_MAX_FAILED_EMAILS,
        };

        Ok(Self {
            database_url,
            smtp_host,
            smtp_port,
            smtp_user,
            smtp_password,
            email_from,
            email_to,
            email_cc: parse_address_list(get("EMAIL_CC").as_deref()),
            email_bcc: parse_address_list(get("EMAIL_BCC").as_deref()),
            report_subject_prefix: get("REPORT_SUBJECT_PREFIX")
                .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
            report_timezone,
            max_failed_emails,
            log_dir: PathBuf::from(get("LOG_DIR").unwrap_or_else(|| "logs".to_string())),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "data".to_string())),
        })
    }

    /// Every address the report goes to: To, then CC, then BCC.
    pub fn recipients(&self) -> Vec<String> {
        std::iter::once(self.email_to.clone())
            .chain(self.email_cc.iter().cloned())
            .chain(self.email_bcc.iter().cloned())
            .collect()
    }

    /// Log the configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            database_url = %redact_url(&self.database_url),
            smtp_host = self.smtp_host.as_str(),
            smtp_port = self.smtp_port,
            smtp_user = self.smtp_user.as_str(),
            smtp_password = %mask(&self.smtp_password),
            email_from = self.email_from.as_str(),
            email_to = self.email_to.as_str(),
            email_cc = ?self.email_cc,
            email_bcc = ?self.email_bcc,
            subject_prefix = self.report_subject_prefix.as_str(),
            timezone = %self.report_timezone,
            max_failed_emails = self.max_failed_emails,
            log_dir = %self.log_dir.display(),
            log_level = self.log_level.as_str(),
            data_dir = %self.data_dir.display(),
            "Configuration loaded"
        );
    }
}

/// Split a comma-separated address list, trimming entries and dropping blanks.
pub fn parse_address_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

/// Mask the password component of a connection URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, password)) => format!("{scheme}://{user}:{}@{host}", mask(password)),
        None => url.to_string(),
    }
}
