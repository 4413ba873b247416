//! Event write types. The store assigns the timestamp.

use cvmon_common::{CvMonError, EventStatus, EventType};
use serde::{Deserialize, Serialize};

/// An event as handed over by a pipeline step, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    pub email: String,
    pub event_type: String,
    pub status: String,
    pub user_id: Option<String>,
    pub error_message: Option<String>,
}

impl RawEvent {
    pub fn new(
        email: impl Into<String>,
        event_type: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            event_type: event_type.into(),
            status: status.into(),
            user_id: None,
            error_message: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// A validated event, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub email: String,
    pub event_type: EventType,
    pub status: EventStatus,
    pub user_id: Option<String>,
    pub error_message: Option<String>,
}

impl NewEvent {
    /// Check `event_type` and `status` against the fixed enumerations.
    pub fn validate(raw: RawEvent) -> Result<Self, CvMonError> {
        let event_type = raw.event_type.parse::<EventType>()?;
        let status = raw.status.parse::<EventStatus>()?;
        Ok(Self {
            email: raw.email,
            event_type,
            status,
            user_id: raw.user_id,
            error_message: raw.error_message,
        })
    }
}
