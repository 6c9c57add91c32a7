//! Schedule types: status-change events, per-day schedules and resolved intervals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{Result, ScheduleError};

/// Minutes in a calendar day. An interval ending here runs to midnight.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// "Starting at this time of day, the status becomes `power_on`."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    pub hour: u8,
    pub minute: u8,
    pub power_on: bool,
}

impl ScheduleEvent {
    pub const fn new(hour: u8, minute: u8, power_on: bool) -> Self {
        Self {
            hour,
            minute,
            power_on,
        }
    }

    /// Minute of day this event takes effect at.
    pub fn minute_of_day(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

/// The ordered status-change events of exactly one calendar date.
///
/// Only constructible through [`DaySchedule::new`], so every instance is
/// sorted strictly by time of day with in-range hours and minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    date: NaiveDate,
    events: Vec<ScheduleEvent>,
}

impl DaySchedule {
    /// Validate and build a schedule.
    ///
    /// Two consecutive events with the same status are accepted; they are
    /// redundant but harmless.
    pub fn new(date: NaiveDate, events: Vec<ScheduleEvent>) -> Result<Self> {
        let invalid = |reason: String| ScheduleError::InvalidScheduleData { date, reason };

        for event in &events {
            if event.hour > 23 || event.minute > 59 {
                return Err(invalid(format!(
                    "event time {:02}:{:02} is out of range",
                    event.hour, event.minute
                )));
            }
        }

        for pair in events.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.minute_of_day() == prev.minute_of_day() {
                return Err(invalid(format!("duplicate event at {}", next.label())));
            }
            if next.minute_of_day() < prev.minute_of_day() {
                return Err(invalid(format!(
                    "event at {} comes after {}",
                    next.label(),
                    prev.label()
                )));
            }
        }

        Ok(Self { date, events })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn events(&self) -> &[ScheduleEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Status in effect when the day ends.
    pub fn trailing_status(&self) -> Option<bool> {
        self.events.last().map(|e| e.power_on)
    }
}

/// A contiguous half-open span `[start_minute, end_minute)` of one day with
/// a constant power status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_minute: u16,
    pub end_minute: u16,
    pub power_on: bool,
}

impl Interval {
    pub fn contains(&self, minute: u16) -> bool {
        self.start_minute <= minute && minute < self.end_minute
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end_minute - self.start_minute
    }

    pub fn start_label(&self) -> String {
        minute_label(self.start_minute)
    }

    /// End time as `HH:MM`; midnight renders as `00:00`.
    pub fn end_label(&self) -> String {
        minute_label(self.end_minute % MINUTES_PER_DAY)
    }
}

/// Format a minute of day as `HH:MM`.
pub fn minute_label(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
