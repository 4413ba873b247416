//! EventTracker: fire-and-forget event writes for the CV pipeline.
//!
//! Logging a processing event must never break the processing itself. Every
//! operation here returns `bool`; validation, connection and query failures
//! are logged and folded into `false`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use cvmon_common::CvMonError;

use crate::types::{NewEvent, RawEvent};

/// Destination for validated events. All events of one call are written in a
/// single transaction.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn insert(&self, events: &[NewEvent]) -> Result<()>;
}

#[derive(Clone)]
pub struct EventTracker {
    sink: Arc<dyn EventSink>,
}

impl EventTracker {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Validate and append one event. Returns true if the row was written.
    pub async fn log_event(&self, raw: RawEvent) -> bool {
        let email = raw.email.clone();
        let event_type = raw.event_type.clone();

        let event = match NewEvent::validate(raw) {
            Ok(event) => event,
            Err(e) => {
                error!(
                    target: "event_tracker",
                    email = email.as_str(),
                    event_type = event_type.as_str(),
                    error = %e,
                    "Rejected event"
                );
                return false;
            }
        };

        match self.sink.insert(std::slice::from_ref(&event)).await {
            Ok(()) => {
                info!(
                    target: "event_tracker",
                    event_type = %event.event_type,
                    email = event.email.as_str(),
                    status = %event.status,
                    "Logged event"
                );
                true
            }
            Err(e) => {
                error!(
                    target: "event_tracker",
                    event_type = %event.event_type,
                    email = event.email.as_str(),
                    error = %e,
                    "Failed to log event (non-critical)"
                );
                false
            }
        }
    }

    /// Append several events in one transaction. An empty batch succeeds
    /// trivially; a batch with any invalid entry is rejected whole.
    pub async fn log_bulk(&self, raws: Vec<RawEvent>) -> bool {
        if raws.is_empty() {
            return true;
        }

        let events = match validate_all(raws) {
            Ok(events) => events,
            Err(e) => {
                error!(target: "event_tracker", error = %e, "Rejected event batch");
                return false;
            }
        };

        match self.sink.insert(&events).await {
            Ok(()) => {
                info!(target: "event_tracker", count = events.len(), "Bulk logged events");
                true
            }
            Err(e) => {
                error!(
                    target: "event_tracker",
                    count = events.len(),
                    error = %e,
                    "Failed to bulk log events (non-critical)"
                );
                false
            }
        }
    }
}

fn validate_all(raws: Vec<RawEvent>) -> Result<Vec<NewEvent>, CvMonError> {
    raws.into_iter()
        .enumerate()
        .map(|(i, raw)| {
            NewEvent::validate(raw)
                .map_err(|e| CvMonError::Validation(format!("entry {i}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSink;
    use cvmon_common::EventType;

    #[tokio::test]
    async fn bogus_event_type_returns_false_and_writes_nothing() {
        let sink = Arc::new(MockSink::new());
        let tracker = EventTracker::new(sink.clone());

        let ok = tracker
            .log_event(RawEvent::new("test@example.com", "bogus", "success"))
            .await;

        assert!(!ok);
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn invalid_status_returns_false() {
        let sink = Arc::new(MockSink::new());
        let tracker = EventTracker::new(sink.clone());

        let ok = tracker
            .log_event(RawEvent::new("test@example.com", "cv_received", "done"))
            .await;

        assert!(!ok);
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn valid_event_is_written() {
        let sink = Arc::new(MockSink::new());
        let tracker = EventTracker::new(sink.clone());

        let ok = tracker
            .log_event(
                RawEvent::new("test@example.com", "cv_received", "success")
                    .with_user_id("TEST001"),
            )
            .await;

        assert!(ok);
        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_type, EventType::CvReceived);
        assert_eq!(rows[0].user_id.as_deref(), Some("TEST001"));
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let sink = Arc::new(MockSink::failing());
        let tracker = EventTracker::new(sink.clone());

        let ok = tracker
            .log_event(RawEvent::new("test@example.com", "cv_received", "success"))
            .await;

        assert!(!ok);
    }

    #[tokio::test]
    async fn bulk_rejects_whole_batch_on_one_invalid_entry() {
        let sink = Arc::new(MockSink::new());
        let tracker = EventTracker::new(sink.clone());

        let ok = tracker
            .log_bulk(vec![
                RawEvent::new("bulk1@example.com", "cv_parsed_success", "success"),
                RawEvent::new("bulk2@example.com", "cv_exploded", "failed"),
            ])
            .await;

        assert!(!ok);
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn bulk_writes_all_valid_entries() {
        let sink = Arc::new(MockSink::new());
        let tracker = EventTracker::new(sink.clone());

        assert!(tracker.log_bulk(Vec::new()).await);

        let ok = tracker
            .log_bulk(vec![
                RawEvent::new("bulk1@example.com", "cv_parsed_success", "success"),
                RawEvent::new("bulk2@example.com", "cv_parsing_failed", "failed")
                    .with_error("Invalid JSON format"),
            ])
            .await;

        assert!(ok);
        assert_eq!(sink.rows().len(), 2);
    }

    #[tokio::test]
    async fn unreachable_database_returns_false() {
        let log =
            crate::store::PgEventLog::connect_lazy("postgres://nobody@127.0.0.1:1/none").unwrap();
        let tracker = EventTracker::new(Arc::new(log));

        let ok = tracker
            .log_event(RawEvent::new("test@example.com", "cv_received", "success"))
            .await;

        assert!(!ok);
    }
}
