//! Configuration schema, stored as camelCase JSON.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::schedule::engine::MissingSchedulePolicy;
use crate::utils::helpers::{expand_path, fixed_offset};

/// Environment variable that overrides the Telegram token from the file.
pub const TELEGRAM_TOKEN_ENV: &str = "POWERBOT_TELEGRAM_TOKEN";

/// The consumer group being tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupConfig {
    pub id: String,
    /// Public page of the grid operator, linked from the bot menu.
    pub site_url: String,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            id: "3.1".to_string(),
            site_url: "https://off.energy.mk.ua/".to_string(),
        }
    }
}

/// Operating timezone. Every day boundary is evaluated in this offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimezoneConfig {
    pub utc_offset_hours: i32,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self { utc_offset_hours: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleConfig {
    /// JSON file mapping ISO dates to event lists.
    pub file: String,
    pub missing_policy: MissingSchedulePolicy,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            file: "~/.powerbot/schedules.json".to_string(),
            missing_policy: MissingSchedulePolicy::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsConfig {
    pub file: String,
    /// Six-field cron expression (with seconds) for the daily
    /// record-and-prune job.
    pub maintenance_cron: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            file: "~/.powerbot/weekly_stats.json".to_string(),
            maintenance_cron: "0 5 0 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: String,
    /// Chat ids allowed to talk to the bot. Empty allows everyone.
    pub allow_from: Vec<String>,
    pub api_base: String,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            allow_from: Vec::new(),
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelsConfig {
    pub telegram: TelegramConfig,
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub group: GroupConfig,
    pub timezone: TimezoneConfig,
    pub schedule: ScheduleConfig,
    pub stats: StatsConfig,
    pub channels: ChannelsConfig,
}

impl Config {
    pub fn tz(&self) -> FixedOffset {
        fixed_offset(self.timezone.utc_offset_hours)
    }

    pub fn schedule_path(&self) -> PathBuf {
        expand_path(&self.schedule.file)
    }

    pub fn stats_path(&self) -> PathBuf {
        expand_path(&self.stats.file)
    }

    /// Telegram token, preferring the environment over the config file.
    pub fn telegram_token(&self) -> Option<String> {
        std::env::var(TELEGRAM_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| Some(self.channels.telegram.token.clone()).filter(|t| !t.is_empty()))
    }

    /// Reject values that would only fail later at runtime.
    pub fn validate(&self) -> Result<()> {
        if !(-12..=14).contains(&self.timezone.utc_offset_hours) {
            bail!(
                "timezone.utcOffsetHours must be within -12..=14, got {}",
                self.timezone.utc_offset_hours
            );
        }
        if self.group.id.trim().is_empty() {
            bail!("group.id cannot be empty");
        }
        validate_http_url(&self.group.site_url).context("group.siteUrl")?;
        validate_http_url(&self.channels.telegram.api_base).context("channels.telegram.apiBase")?;
        cron::Schedule::from_str(&self.stats.maintenance_cron)
            .with_context(|| format!("stats.maintenanceCron '{}'", self.stats.maintenance_cron))?;
        Ok(())
    }
}

fn validate_http_url(value: &str) -> Result<()> {
    let parsed = Url::parse(value).with_context(|| format!("invalid URL '{}'", value))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => bail!("only http/https allowed, got '{}'", other),
    }
    if parsed.host_str().is_none() {
        bail!("missing host in '{}'", value);
    }
    Ok(())
}
