//! Time-pivot normalization
//!
//! Diary nights span two calendar dates: bed at 23:00 belongs to the log
//! date, wake at 07:00 to the day after. A bare time-of-day is assigned to
//! one side of midnight by a fixed pivot: times at or after 18:00 fall on
//! the log date, earlier times on the following day. The pivot is applied
//! identically to every event of a night so their relative order survives
//! the midnight crossing.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Times at or after this hour belong to the log date itself
pub const PIVOT_HOUR: u32 = 18;

/// Resolve a time-of-day against a night's log date into an absolute timestamp
pub fn resolve_timestamp(time: NaiveTime, log_date: NaiveDate) -> NaiveDateTime {
    if time.hour() >= PIVOT_HOUR {
        log_date.and_time(time)
    } else {
        (log_date + Days::new(1)).and_time(time)
    }
}
