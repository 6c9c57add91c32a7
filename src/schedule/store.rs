//! Schedule store: read-only lookup from calendar date to that day's events.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::error::{Result, ScheduleError};
use super::types::{DaySchedule, ScheduleEvent};

/// On-disk shape of a schedule file: ISO date -> ordered events.
pub type RawSchedules = BTreeMap<String, Vec<ScheduleEvent>>;

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| ScheduleError::InvalidArgument(format!("'{}' is not a YYYY-MM-DD date: {}", date, e)))
}

/// Read-only source of per-day schedules.
///
/// `None` means "no schedule configured for this date", which callers must
/// handle explicitly. It is distinct from a configured but empty day.
pub trait ScheduleStore: Send + Sync {
    fn get_schedule(&self, date: NaiveDate) -> Option<&DaySchedule>;

    /// Look up a schedule by ISO date string, returning the parsed date with it.
    fn lookup(&self, date: &str) -> Result<(NaiveDate, Option<&DaySchedule>)> {
        let date = parse_date(date)?;
        Ok((date, self.get_schedule(date)))
    }
}

/// In-memory store loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticScheduleStore {
    days: BTreeMap<NaiveDate, DaySchedule>,
}

impl StaticScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate raw schedule data. Any malformed date key or event list
    /// rejects the whole document.
    pub fn from_raw(raw: RawSchedules) -> Result<Self> {
        let mut store = Self::new();
        for (key, events) in raw {
            let date = parse_date(&key)?;
            store.insert(DaySchedule::new(date, events)?);
        }
        Ok(store)
    }

    /// Load and validate a JSON schedule file.
    pub fn load(path: &Path) -> AnyResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schedule file {}", path.display()))?;
        let raw: RawSchedules = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse schedule file {}", path.display()))?;
        let store = Self::from_raw(raw)
            .with_context(|| format!("Invalid schedule file {}", path.display()))?;
        if store.is_empty() {
            warn!("Schedule file {} has no days", path.display());
        } else {
            let dates = store.dates();
            info!(
                "Loaded schedules for {} day(s), {} to {}, from {}",
                store.len(),
                dates[0],
                dates[dates.len() - 1],
                path.display()
            );
        }
        Ok(store)
    }

    /// Add or replace one day.
    pub fn insert(&mut self, schedule: DaySchedule) {
        debug!("Schedule store: set {}", schedule.date());
        self.days.insert(schedule.date(), schedule);
    }

    /// Configured dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Convert back to the on-disk shape.
    pub fn to_raw(&self) -> RawSchedules {
        self.days
            .iter()
            .map(|(date, day)| (date.format("%Y-%m-%d").to_string(), day.events().to_vec()))
            .collect()
    }
}

impl ScheduleStore for StaticScheduleStore {
    fn get_schedule(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.days.get(&date)
    }
}
