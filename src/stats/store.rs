//! File-backed daily statistics, keyed by ISO date.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use crate::schedule::engine::StatusEngine;
use crate::schedule::stats::{day_stats, summarize, DailyStats, RangeSummary};
use crate::schedule::types::DaySchedule;

/// Persistent store for per-day statistics.
pub struct StatsStore {
    path: PathBuf,
    days: BTreeMap<NaiveDate, DailyStats>,
    existed: bool,
}

impl StatsStore {
    /// Open the stats file. A missing or unreadable file yields an empty store.
    pub fn open(path: PathBuf) -> Self {
        let existed = path.exists();
        let days = if existed {
            match std::fs::read_to_string(&path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    warn!("Failed to parse stats file {}: {}", path.display(), e);
                    BTreeMap::new()
                }),
                Err(e) => {
                    warn!("Failed to read stats file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        Self {
            path,
            days,
            existed,
        }
    }

    /// All recorded days in ascending date order.
    pub fn entries(&self) -> Vec<(NaiveDate, DailyStats)> {
        self.days.iter().map(|(d, s)| (*d, *s)).collect()
    }

    pub fn summary(&self) -> RangeSummary {
        summarize(self.days.values())
    }

    /// Record one day and persist.
    pub fn record(&mut self, date: NaiveDate, stats: DailyStats) {
        self.days.insert(date, stats);
        self.persist();
    }

    /// Compute a day's stats from its schedule and record them. A missing or
    /// empty schedule is recorded as the no-data sentinel.
    pub fn record_from_schedule(&mut self, date: NaiveDate, schedule: Option<&DaySchedule>) -> DailyStats {
        let stats = day_stats(schedule);
        self.record(date, stats);
        stats
    }

    /// On first run, fill yesterday and today from the schedule.
    pub fn seed_if_new(&mut self, engine: &StatusEngine, today: NaiveDate) -> bool {
        if self.existed {
            return false;
        }
        info!("Stats file not found, seeding {}", self.path.display());
        for date in [today - Duration::days(1), today] {
            self.record_from_schedule(date, engine.store().get_schedule(date));
        }
        self.existed = true;
        true
    }

    /// Drop days older than yesterday. Returns how many were removed.
    pub fn cleanup_old_days(&mut self, today: NaiveDate) -> usize {
        let yesterday = today - Duration::days(1);
        let before = self.days.len();
        self.days.retain(|date, _| *date >= yesterday);
        let removed = before - self.days.len();
        if removed > 0 {
            self.persist();
            info!("Stats: pruned {} day(s) older than {}", removed, yesterday);
        }
        removed
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        match serde_json::to_string_pretty(&self.days) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!("Failed to persist stats: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize stats: {}", e),
        }
    }
}
