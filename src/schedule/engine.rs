//! Status engine: answers "what is the status at time T and when does it end?"
//!
//! A naive "find the current interval and report its end" is wrong near
//! midnight: an interval that runs to 00:00 usually continues into the next
//! day. When the current status holds until the end of today, the engine
//! looks into tomorrow's schedule for the first real change.
//!
//! All timestamps are evaluated in the engine's fixed operating offset,
//! never in the host machine's local zone.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::resolver::{resolve_intervals, status_at_minute};
use super::store::ScheduleStore;
use super::types::{minute_label, Interval, MINUTES_PER_DAY};

/// Label used when tomorrow's schedule never changes status.
pub const UNIFORM_TOMORROW_LABEL: &str = "23:59 (tomorrow)";

const LAST_MINUTE: u16 = MINUTES_PER_DAY - 1;

/// What to report for a date with no configured schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingSchedulePolicy {
    /// Report the status as unknown.
    #[default]
    Unknown,
    /// Treat the day as one all-day power-on interval.
    AssumePowerOn,
}

/// Which branch of boundary resolution produced the end of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// The status changes later today.
    SameDay,
    /// The status holds past midnight and changes at some point tomorrow.
    NextDayChange,
    /// Tomorrow never changes status; the end is a 23:59 placeholder.
    NextDayUniform,
    /// Nothing is known about tomorrow; the window ends at midnight.
    NoNextDaySchedule,
}

/// The active status and its resolved boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerWindow {
    pub is_power_on: bool,
    pub current_interval_start: DateTime<FixedOffset>,
    pub real_end: DateTime<FixedOffset>,
    pub end_label: String,
    pub boundary: BoundaryKind,
}

impl PowerWindow {
    /// Time spent in the current status, never negative.
    pub fn elapsed(&self, now: DateTime<FixedOffset>) -> Duration {
        (now - self.current_interval_start).max(Duration::zero())
    }

    /// Time left until the next transition, never negative.
    pub fn remaining(&self, now: DateTime<FixedOffset>) -> Duration {
        (self.real_end - now).max(Duration::zero())
    }
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSnapshot {
    /// No schedule, or an empty one, for the queried date.
    Unavailable,
    Known(PowerWindow),
}

impl StatusSnapshot {
    /// `None` when the schedule is unavailable.
    pub fn window(&self) -> Option<&PowerWindow> {
        match self {
            StatusSnapshot::Unavailable => None,
            StatusSnapshot::Known(window) => Some(window),
        }
    }
}

/// Stateless query engine over an injected schedule store.
#[derive(Clone)]
pub struct StatusEngine {
    store: Arc<dyn ScheduleStore>,
    tz: FixedOffset,
    missing_policy: MissingSchedulePolicy,
}

impl StatusEngine {
    pub fn new(store: Arc<dyn ScheduleStore>, tz: FixedOffset) -> Self {
        Self {
            store,
            tz,
            missing_policy: MissingSchedulePolicy::default(),
        }
    }

    pub fn with_missing_policy(mut self, policy: MissingSchedulePolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    pub fn store(&self) -> &dyn ScheduleStore {
        self.store.as_ref()
    }

    pub fn timezone(&self) -> FixedOffset {
        self.tz
    }

    /// Intervals for `date`. A date without a schedule, or with an empty
    /// event list, follows the missing policy: `None` under
    /// [`MissingSchedulePolicy::Unknown`].
    pub fn get_intervals_for_date(&self, date: NaiveDate) -> Option<Vec<Interval>> {
        match self.store.get_schedule(date) {
            Some(schedule) if !schedule.is_empty() => Some(resolve_intervals(schedule)),
            _ => match self.missing_policy {
                MissingSchedulePolicy::Unknown => None,
                MissingSchedulePolicy::AssumePowerOn => Some(vec![Interval {
                    start_minute: 0,
                    end_minute: MINUTES_PER_DAY,
                    power_on: true,
                }]),
            },
        }
    }

    /// Status at a minute of `date`, if known.
    pub fn status_at(&self, date: NaiveDate, minute: u16) -> Option<bool> {
        status_at_minute(&self.get_intervals_for_date(date)?, minute)
    }

    /// Resolve the status at `now` and the real time of the next transition.
    ///
    /// Consecutive intervals with the same status count as one window, so
    /// redundant events move neither the window start nor its end.
    pub fn get_status(&self, now: DateTime<FixedOffset>) -> StatusSnapshot {
        let now = now.with_timezone(&self.tz);
        let today = now.date_naive();
        let minute = (now.hour() * 60 + now.minute()) as u16;

        let Some(intervals) = self.get_intervals_for_date(today) else {
            return StatusSnapshot::Unavailable;
        };
        let Some(idx) = intervals.iter().position(|i| i.contains(minute)) else {
            return StatusSnapshot::Unavailable;
        };
        let status = intervals[idx].power_on;

        // Redundant same-status events do not split a window.
        let start_idx = intervals[..idx]
            .iter()
            .rposition(|i| i.power_on != status)
            .map_or(0, |i| i + 1);
        let current_interval_start = self.at_minute(today, intervals[start_idx].start_minute);

        let window = |real_end, end_label, boundary| {
            StatusSnapshot::Known(PowerWindow {
                is_power_on: status,
                current_interval_start,
                real_end,
                end_label,
                boundary,
            })
        };

        if let Some(change) = intervals[idx + 1..].iter().find(|i| i.power_on != status) {
            return window(
                self.at_minute(today, change.start_minute),
                change.start_label(),
                BoundaryKind::SameDay,
            );
        }

        // The status holds until midnight: the real end lies in tomorrow.
        let tomorrow = today
            .succ_opt()
            .and_then(|date| self.get_intervals_for_date(date).map(|iv| (date, iv)));

        match tomorrow {
            Some((date, tomorrow_intervals)) => {
                match tomorrow_intervals.iter().find(|i| i.power_on != status) {
                    Some(change) => window(
                        self.at_minute(date, change.start_minute),
                        change.start_label(),
                        BoundaryKind::NextDayChange,
                    ),
                    None => window(
                        self.at_minute(date, LAST_MINUTE),
                        UNIFORM_TOMORROW_LABEL.to_string(),
                        BoundaryKind::NextDayUniform,
                    ),
                }
            }
            None => window(
                self.at_minute(today, MINUTES_PER_DAY),
                minute_label(0),
                BoundaryKind::NoNextDaySchedule,
            ),
        }
    }

    /// Absolute timestamp of `minute` (0..=1440) on `date` in the operating offset.
    fn at_minute(&self, date: NaiveDate, minute: u16) -> DateTime<FixedOffset> {
        let local = date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(minute));
        let utc = local - Duration::seconds(i64::from(self.tz.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, self.tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::store::StaticScheduleStore;
    use crate::schedule::types::{DaySchedule, ScheduleEvent};

    fn kyiv() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        date(day)
            .and_hms_opt(hour, minute, 0)
            .unwrap()
            .and_local_timezone(kyiv())
            .unwrap()
    }

    fn power(snapshot: &StatusSnapshot) -> Option<bool> {
        snapshot.window().map(|w| w.is_power_on)
    }

    fn engine(days: &[(u32, &[(u8, u8, bool)])]) -> StatusEngine {
        let mut store = StaticScheduleStore::new();
        for (day, events) in days {
            let events = events
                .iter()
                .map(|&(h, m, on)| ScheduleEvent::new(h, m, on))
                .collect();
            store.insert(DaySchedule::new(date(*day), events).unwrap());
        }
        StatusEngine::new(Arc::new(store), kyiv())
    }

    const DAY_14: &[(u8, u8, bool)] = &[(0, 0, true), (6, 30, false), (9, 30, true)];
    const DAY_15: &[(u8, u8, bool)] = &[
        (0, 0, true),
        (10, 30, false),
        (13, 0, true),
        (17, 30, false),
        (20, 0, true),
    ];

    #[test]
    fn test_outage_in_progress_ends_same_day() {
        let engine = engine(&[(14, DAY_14)]);
        let snapshot = engine.get_status(at(14, 7, 0));
        let window = snapshot.window().unwrap();

        assert_eq!(power(&snapshot), Some(false));
        assert_eq!(window.end_label, "09:30");
        assert_eq!(window.current_interval_start, at(14, 6, 30));
        assert_eq!(window.real_end, at(14, 9, 30));
        assert_eq!(window.boundary, BoundaryKind::SameDay);
    }

    #[test]
    fn test_last_interval_without_tomorrow_ends_at_midnight() {
        let engine = engine(&[(15, DAY_15)]);
        let snapshot = engine.get_status(at(15, 23, 0));
        let window = snapshot.window().unwrap();

        assert_eq!(power(&snapshot), Some(true));
        assert_eq!(window.end_label, "00:00");
        assert_eq!(window.real_end, at(16, 0, 0));
        assert_eq!(window.current_interval_start, at(15, 20, 0));
        assert_eq!(window.boundary, BoundaryKind::NoNextDaySchedule);
    }

    #[test]
    fn test_cross_midnight_finds_tomorrows_first_change() {
        let engine = engine(&[(16, &[(0, 0, true)]), (17, &[(0, 0, true), (8, 0, false)])]);
        let snapshot = engine.get_status(at(16, 23, 30));
        let window = snapshot.window().unwrap();

        assert_eq!(power(&snapshot), Some(true));
        assert_eq!(window.real_end, at(17, 8, 0));
        assert_eq!(window.end_label, "08:00");
        assert_eq!(window.boundary, BoundaryKind::NextDayChange);
    }

    #[test]
    fn test_cross_midnight_at_last_minute() {
        let engine = engine(&[
            (15, DAY_15),
            (16, &[(0, 0, true), (6, 30, true), (6, 45, false), (9, 0, true)]),
        ]);
        let window = engine.get_status(at(15, 23, 59)).window().cloned().unwrap();
        assert_eq!(window.real_end, at(16, 6, 45));
        assert_ne!(window.real_end, at(16, 0, 0));
    }

    #[test]
    fn test_change_right_at_midnight() {
        let engine = engine(&[(15, DAY_15), (16, &[(0, 0, false), (4, 0, true)])]);
        let window = engine.get_status(at(15, 22, 0)).window().cloned().unwrap();
        assert_eq!(window.real_end, at(16, 0, 0));
        assert_eq!(window.end_label, "00:00");
        assert_eq!(window.boundary, BoundaryKind::NextDayChange);
    }

    #[test]
    fn test_uniform_tomorrow_uses_placeholder() {
        let engine = engine(&[(15, DAY_15), (16, &[(0, 0, true)])]);
        let window = engine.get_status(at(15, 21, 0)).window().cloned().unwrap();
        assert_eq!(window.real_end, at(16, 23, 59));
        assert_eq!(window.end_label, UNIFORM_TOMORROW_LABEL);
        assert_eq!(window.boundary, BoundaryKind::NextDayUniform);
    }

    #[test]
    fn test_missing_schedule_is_unavailable() {
        let engine = engine(&[(14, DAY_14)]);
        let snapshot = engine.get_status(at(20, 12, 0));
        assert_eq!(snapshot, StatusSnapshot::Unavailable);
        assert_eq!(power(&snapshot), None);
        assert!(engine.get_intervals_for_date(date(20)).is_none());
    }

    #[test]
    fn test_empty_day_today_is_unavailable() {
        let engine = engine(&[(14, &[])]);
        let snapshot = engine.get_status(at(14, 12, 0));
        assert_eq!(snapshot, StatusSnapshot::Unavailable);
        assert_eq!(power(&snapshot), None);
        assert!(engine.get_intervals_for_date(date(14)).is_none());
        assert_eq!(engine.status_at(date(14), 0), None);
    }

    #[test]
    fn test_empty_day_tomorrow_ends_at_midnight() {
        let engine = engine(&[(14, &[(0, 0, true)]), (15, &[])]);
        let window = engine.get_status(at(14, 23, 0)).window().cloned().unwrap();
        assert_eq!(window.end_label, "00:00");
        assert_eq!(window.real_end, at(15, 0, 0));
        assert_eq!(window.boundary, BoundaryKind::NoNextDaySchedule);
    }

    #[test]
    fn test_empty_day_follows_assume_power_on_policy() {
        let engine = engine(&[(14, &[])]).with_missing_policy(MissingSchedulePolicy::AssumePowerOn);
        assert_eq!(power(&engine.get_status(at(14, 12, 0))), Some(true));
    }

    #[test]
    fn test_assume_power_on_policy() {
        let engine = engine(&[(15, DAY_15)]).with_missing_policy(MissingSchedulePolicy::AssumePowerOn);

        let snapshot = engine.get_status(at(20, 12, 0));
        assert_eq!(power(&snapshot), Some(true));

        // Tomorrow is assumed all-on, so today's trailing power-on never changes.
        let window = engine.get_status(at(15, 21, 0)).window().cloned().unwrap();
        assert_eq!(window.boundary, BoundaryKind::NextDayUniform);
    }

    #[test]
    fn test_get_status_is_idempotent() {
        let engine = engine(&[(15, DAY_15), (16, &[(0, 0, true), (8, 0, false)])]);
        for now in [at(15, 0, 0), at(15, 12, 15), at(15, 23, 59)] {
            assert_eq!(engine.get_status(now), engine.get_status(now));
        }
    }

    #[test]
    fn test_now_is_normalized_to_operating_offset() {
        let engine = engine(&[(14, DAY_14)]);
        // 05:00 UTC is 07:00 in UTC+2.
        let utc_now = DateTime::parse_from_rfc3339("2026-02-14T05:00:00+00:00").unwrap();
        let snapshot = engine.get_status(utc_now);
        assert_eq!(power(&snapshot), Some(false));
        assert_eq!(snapshot.window().unwrap().end_label, "09:30");
    }

    #[test]
    fn test_redundant_events_do_not_split_window() {
        let engine = engine(&[(14, &[(0, 0, true), (3, 0, true), (8, 0, true), (12, 0, false)])]);
        let window = engine.get_status(at(14, 4, 0)).window().cloned().unwrap();
        assert_eq!(window.current_interval_start, at(14, 0, 0));
        assert_eq!(window.real_end, at(14, 12, 0));
        assert_eq!(window.end_label, "12:00");
    }

    #[test]
    fn test_trailing_redundant_events_trigger_lookahead() {
        let engine = engine(&[
            (14, &[(0, 0, false), (20, 0, true), (22, 0, true)]),
            (15, DAY_15),
        ]);
        let window = engine.get_status(at(14, 21, 0)).window().cloned().unwrap();
        assert_eq!(window.real_end, at(15, 10, 30));
        assert_eq!(window.boundary, BoundaryKind::NextDayChange);
    }

    #[test]
    fn test_leading_gap_of_tomorrow_is_considered() {
        // Tomorrow's leading gap repeats its last status (off), so power on
        // today ends at midnight.
        let engine = engine(&[(14, &[(0, 0, true)]), (15, &[(6, 0, true), (22, 0, false)])]);
        let window = engine.get_status(at(14, 23, 0)).window().cloned().unwrap();
        assert_eq!(window.real_end, at(15, 0, 0));
        assert_eq!(window.boundary, BoundaryKind::NextDayChange);
    }

    #[test]
    fn test_elapsed_and_remaining_clamp_to_zero() {
        let engine = engine(&[(14, DAY_14)]);
        let window = engine.get_status(at(14, 7, 0)).window().cloned().unwrap();

        assert_eq!(window.elapsed(at(14, 7, 0)), Duration::minutes(30));
        assert_eq!(window.remaining(at(14, 7, 0)), Duration::minutes(150));

        // A stale snapshot evaluated later, or a clock that went backwards.
        assert_eq!(window.remaining(at(14, 10, 0)), Duration::zero());
        assert_eq!(window.elapsed(at(14, 6, 0)), Duration::zero());
    }

    #[test]
    fn test_status_at() {
        let engine = engine(&[(14, DAY_14)]);
        assert_eq!(engine.status_at(date(14), 7 * 60), Some(false));
        assert_eq!(engine.status_at(date(14), 10 * 60), Some(true));
        assert_eq!(engine.status_at(date(14), MINUTES_PER_DAY), Some(true));
        assert_eq!(engine.status_at(date(13), 0), None);
    }
}
