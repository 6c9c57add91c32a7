//! Daily statistics maintenance driven by a cron expression.
//!
//! Each run records today's stats from the schedule and prunes days older
//! than yesterday.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use cron::Schedule;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::schedule::engine::StatusEngine;
use crate::stats::store::StatsStore;
use crate::utils::helpers::now_in;

/// Outcome of one maintenance run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaintenanceReport {
    pub recorded_no_data: bool,
    pub pruned: usize,
}

pub struct MaintenanceJob {
    schedule: Schedule,
    engine: Arc<StatusEngine>,
    stats: Arc<Mutex<StatsStore>>,
}

impl MaintenanceJob {
    pub fn new(expr: &str, engine: Arc<StatusEngine>, stats: Arc<Mutex<StatsStore>>) -> Result<Self> {
        let schedule = Schedule::from_str(expr)
            .with_context(|| format!("Invalid maintenance cron expression '{}'", expr))?;
        Ok(Self {
            schedule,
            engine,
            stats,
        })
    }

    /// First run strictly after `now`, in the engine's offset.
    pub fn next_run_after(&self, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let now = now.with_timezone(&self.engine.timezone());
        self.schedule.after(&now).next()
    }

    pub async fn run_once(&self, now: DateTime<FixedOffset>) -> MaintenanceReport {
        let today = now.with_timezone(&self.engine.timezone()).date_naive();
        let mut stats = self.stats.lock().await;
        let recorded = stats.record_from_schedule(today, self.engine.store().get_schedule(today));
        let pruned = stats.cleanup_old_days(today);
        info!(
            "Maintenance: recorded {} ({:.1} h on / {:.1} h off), pruned {}",
            today, recorded.hours_with_power, recorded.hours_without_power, pruned
        );
        MaintenanceReport {
            recorded_no_data: recorded.is_sentinel(),
            pruned,
        }
    }

    /// Sleep until each scheduled time and run. Never returns unless the
    /// expression has no future occurrences.
    pub async fn run(&self) {
        loop {
            let now = now_in(self.engine.timezone());
            let Some(next) = self.next_run_after(now) else {
                warn!("Maintenance schedule has no upcoming runs, stopping");
                return;
            };
            debug!("Next maintenance run at {}", next);
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            self.run_once(now_in(self.engine.timezone())).await;
        }
    }
}
