use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CvMonError;

// =============================================================================
// Event enumerations
// =============================================================================

/// Lifecycle events written to `cv_processing_log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CvReceived,
    CvRejected,
    CvParsedSuccess,
    CvParsingFailed,
    CvInsertionFailed,
    ActivityUpdated,
    ActivityUpdateFailed,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        Self::CvReceived,
        Self::CvRejected,
        Self::CvParsedSuccess,
        Self::CvParsingFailed,
        Self::CvInsertionFailed,
        Self::ActivityUpdated,
        Self::ActivityUpdateFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CvReceived => "cv_received",
            Self::CvRejected => "cv_rejected",
            Self::CvParsedSuccess => "cv_parsed_success",
            Self::CvParsingFailed => "cv_parsing_failed",
            Self::CvInsertionFailed => "cv_insertion_failed",
            Self::ActivityUpdated => "activity_updated",
            Self::ActivityUpdateFailed => "activity_update_failed",
        }
    }

    /// Human label used in reports: `cv_parsing_failed` -> `Cv Parsing Failed`.
    pub fn display_label(raw: &str) -> String {
        raw.split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = CvMonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                CvMonError::Validation(format!(
                    "Invalid event_type: {s}. Must be one of {valid:?}"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Success,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = CvMonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(CvMonError::Validation(format!(
                "Invalid status: {other}. Must be 'success' or 'failed'"
            ))),
        }
    }
}

// =============================================================================
// Query rows
// =============================================================================

/// One failed event from the log, as shown in the report's failure table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEvent {
    pub email: String,
    pub event_type: String,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time counts from tables outside the event log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub unprocessed_cvs: u64,
    pub active_batches: u64,
    pub pending_insertions: u64,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unprocessed_cvs={} active_batches={} pending_insertions={}",
            self.unprocessed_cvs, self.active_batches, self.pending_insertions,
        )
    }
}
