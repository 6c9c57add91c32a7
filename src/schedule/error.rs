//! Errors raised while loading or querying schedule data.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Caller passed something that is not a calendar date (or a valid time).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Schedule data failed validation at load time.
    #[error("Invalid schedule for {date}: {reason}")]
    InvalidScheduleData { date: NaiveDate, reason: String },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
