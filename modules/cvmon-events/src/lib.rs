//! The CV processing event log.
//!
//! Writes go through [`EventTracker`], which never fails its caller. Reads go
//! through the [`EventLogReader`] and [`PipelineStatusReader`] traits so the
//! report can be built against an in-memory log in tests.

pub mod store;
pub mod tracker;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use store::PgEventLog;
pub use tracker::{EventSink, EventTracker};
pub use traits::{EventLogReader, PipelineStatusReader};
pub use types::{NewEvent, RawEvent};
