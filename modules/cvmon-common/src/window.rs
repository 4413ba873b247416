//! The calendar day a report covers.
//!
//! The day is resolved once per run in the report timezone and carried to
//! every query as half-open UTC bounds, so a run that straddles midnight still
//! reads one consistent day.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::CvMonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub date: NaiveDate,
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound.
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    /// The window for `date` as observed in `tz`.
    pub fn for_date(date: NaiveDate, tz: Tz) -> Result<Self, CvMonError> {
        let next = date
            .succ_opt()
            .ok_or_else(|| CvMonError::Config(format!("No day follows {date}")))?;
        Ok(Self {
            date,
            start: start_of_day(date, tz)?,
            end: start_of_day(next, tz)?,
        })
    }

    /// The day before `now`'s local date in `tz`.
    pub fn previous_day(now: DateTime<Utc>, tz: Tz) -> Result<Self, CvMonError> {
        let today = now.with_timezone(&tz).date_naive();
        let yesterday = today
            .pred_opt()
            .ok_or_else(|| CvMonError::Config(format!("No day precedes {today}")))?;
        Self::for_date(yesterday, tz)
    }
}

/// First instant of `date` in `tz`. Zones that skip local midnight for a DST
/// change start the day at the first local time that exists.
fn start_of_day(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, CvMonError> {
    let midnight: NaiveDateTime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CvMonError::Config(format!("Invalid midnight for {date}")))?;

    for offset_minutes in (0..=180).step_by(30) {
        let local = midnight + Duration::minutes(offset_minutes);
        if let Some(dt) = tz.from_local_datetime(&local).earliest() {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    Err(CvMonError::Config(format!(
        "Cannot resolve start of {date} in timezone {tz}"
    )))
}
