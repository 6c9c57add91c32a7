//! Hours with and without power, per day and across date ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::resolver::resolve_intervals;
use super::store::ScheduleStore;
use super::types::DaySchedule;

/// Hours with/without power for one day.
///
/// `{0.0, 0.0}` means "no data for this date", not a blackout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyStats {
    pub hours_with_power: f64,
    pub hours_without_power: f64,
}

impl DailyStats {
    pub const NO_DATA: DailyStats = DailyStats {
        hours_with_power: 0.0,
        hours_without_power: 0.0,
    };

    pub fn is_sentinel(&self) -> bool {
        self.hours_with_power == 0.0 && self.hours_without_power == 0.0
    }
}

/// Sum interval durations by status.
pub fn aggregate(schedule: &DaySchedule) -> DailyStats {
    let (on, off) = resolve_intervals(schedule)
        .iter()
        .fold((0u32, 0u32), |(on, off), interval| {
            let minutes = u32::from(interval.duration_minutes());
            if interval.power_on {
                (on + minutes, off)
            } else {
                (on, off + minutes)
            }
        });
    DailyStats {
        hours_with_power: f64::from(on) / 60.0,
        hours_without_power: f64::from(off) / 60.0,
    }
}

/// Stats for a possibly missing day. A missing or empty schedule yields
/// [`DailyStats::NO_DATA`].
pub fn day_stats(schedule: Option<&DaySchedule>) -> DailyStats {
    match schedule {
        Some(schedule) if !schedule.is_empty() => aggregate(schedule),
        _ => DailyStats::NO_DATA,
    }
}

/// Per-day stats for every date in `from..=to`. Dates without a schedule
/// yield [`DailyStats::NO_DATA`].
pub fn aggregate_range(
    store: &dyn ScheduleStore,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<(NaiveDate, DailyStats)> {
    from.iter_days()
        .take_while(|date| *date <= to)
        .map(|date| (date, day_stats(store.get_schedule(date))))
        .collect()
}

/// Totals and averages over several days.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSummary {
    pub total_with_power: f64,
    pub total_without_power: f64,
    /// Days that carried real data; sentinel days are not counted.
    pub days_with_data: usize,
    pub average_with_power: Option<f64>,
    pub average_without_power: Option<f64>,
}

/// Sum field-wise and average over the days that have real data.
pub fn summarize<'a, I>(days: I) -> RangeSummary
where
    I: IntoIterator<Item = &'a DailyStats>,
{
    let mut summary = RangeSummary::default();
    for day in days {
        summary.total_with_power += day.hours_with_power;
        summary.total_without_power += day.hours_without_power;
        if !day.is_sentinel() {
            summary.days_with_data += 1;
        }
    }
    if summary.days_with_data > 0 {
        let n = summary.days_with_data as f64;
        summary.average_with_power = Some(summary.total_with_power / n);
        summary.average_without_power = Some(summary.total_without_power / n);
    }
    summary
}
