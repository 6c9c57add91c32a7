//! Turns a sparse event list into contiguous intervals covering a whole day.

use super::types::{DaySchedule, Interval, MINUTES_PER_DAY};

/// Resolve a day's events into contiguous intervals ending at midnight.
///
/// - An empty schedule yields one all-day power-on interval.
/// - When the first event starts after 00:00, the leading gap repeats the
///   status of the day's last event.
pub fn resolve_intervals(schedule: &DaySchedule) -> Vec<Interval> {
    let events = schedule.events();
    let Some(first) = events.first() else {
        return vec![Interval {
            start_minute: 0,
            end_minute: MINUTES_PER_DAY,
            power_on: true,
        }];
    };

    let mut intervals = Vec::with_capacity(events.len() + 1);

    if first.minute_of_day() > 0 {
        let carried = schedule.trailing_status().unwrap_or(first.power_on);
        intervals.push(Interval {
            start_minute: 0,
            end_minute: first.minute_of_day(),
            power_on: carried,
        });
    }

    for (i, event) in events.iter().enumerate() {
        let end_minute = events
            .get(i + 1)
            .map(|next| next.minute_of_day())
            .unwrap_or(MINUTES_PER_DAY);
        intervals.push(Interval {
            start_minute: event.minute_of_day(),
            end_minute,
            power_on: event.power_on,
        });
    }

    intervals
}

/// Status in effect at `minute` among resolved intervals. Minutes past the
/// end of the day read as the last minute.
pub fn status_at_minute(intervals: &[Interval], minute: u16) -> Option<bool> {
    let minute = minute.min(MINUTES_PER_DAY - 1);
    intervals
        .iter()
        .find(|interval| interval.contains(minute))
        .map(|interval| interval.power_on)
}
