//! powerbot - outage schedule tracker for a single consumer group.

mod bot;
mod bus;
mod channels;
mod config;
mod maintenance;
mod schedule;
mod stats;
mod utils;

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::bot::dispatcher::BotLoop;
use crate::bot::render;
use crate::bus::events::{InboundMessage, OutboundMessage};
use crate::channels::base::Channel;
use crate::channels::telegram::TelegramChannel;
use crate::config::loader::{get_config_path, load_config, save_config};
use crate::config::schema::{Config, TELEGRAM_TOKEN_ENV};
use crate::maintenance::MaintenanceJob;
use crate::schedule::engine::StatusEngine;
use crate::schedule::stats::{aggregate_range, summarize};
use crate::schedule::store::{parse_date, RawSchedules, StaticScheduleStore};
use crate::schedule::types::ScheduleEvent;
use crate::stats::store::StatsStore;
use crate::utils::helpers::{ensure_dir, now_in};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LOGO: &str = "\u{26A1}";

#[derive(Parser, Debug)]
#[command(name = "powerbot", about = "powerbot - outage schedule tracker", version = VERSION)]
struct Cli {
    /// Config file (defaults to ~/.powerbot/config.json).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config and a sample schedule file.
    Onboard,
    /// Is power on right now?
    Status {
        /// Evaluate at this RFC 3339 timestamp or HH:MM today.
        #[arg(long)]
        at: Option<String>,
    },
    /// Time in the current status and until the next change.
    Timer {
        /// Evaluate at this RFC 3339 timestamp or HH:MM today.
        #[arg(long)]
        at: Option<String>,
    },
    /// Full schedule for a day.
    Schedule {
        /// Date as YYYY-MM-DD.
        #[arg(short, long, conflicts_with = "tomorrow")]
        date: Option<String>,
        /// Show tomorrow instead of today.
        #[arg(short, long)]
        tomorrow: bool,
    },
    /// Manage recorded statistics.
    Stats {
        #[command(subcommand)]
        action: StatsAction,
    },
    /// Run the Telegram bot and the maintenance job.
    Gateway,
}

#[derive(Subcommand, Debug)]
enum StatsAction {
    /// Show recorded days, averages and a chart.
    Show,
    /// Compute a day's stats from the schedule and record them.
    Record {
        /// Date as YYYY-MM-DD (defaults to today).
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Drop days older than yesterday.
    Cleanup,
    /// Stats computed straight from the schedule for a date range.
    Range {
        /// First date, YYYY-MM-DD.
        from: String,
        /// Last date, YYYY-MM-DD.
        to: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = cli.config.unwrap_or_else(get_config_path);

    let result = match cli.command {
        Commands::Onboard => cmd_onboard(&config_path),
        Commands::Status { at } => cmd_status(&config_path, at.as_deref()),
        Commands::Timer { at } => cmd_timer(&config_path, at.as_deref()),
        Commands::Schedule { date, tomorrow } => {
            cmd_schedule(&config_path, date.as_deref(), tomorrow)
        }
        Commands::Stats { action } => match action {
            StatsAction::Show => cmd_stats_show(&config_path),
            StatsAction::Record { date } => cmd_stats_record(&config_path, date.as_deref()),
            StatsAction::Cleanup => cmd_stats_cleanup(&config_path),
            StatsAction::Range { from, to } => cmd_stats_range(&config_path, &from, &to),
        },
        Commands::Gateway => cmd_gateway(&config_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Onboard
// ============================================================================

fn cmd_onboard(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        print!("Overwrite? [y/N] ");
        io::stdout().flush().ok();
        let mut input = String::new();
        io::stdin().read_line(&mut input).ok();
        if !input.trim().eq_ignore_ascii_case("y") {
            return Ok(());
        }
    }

    let config = Config::default();
    save_config(&config, Some(config_path));
    println!("  Created config at {}", config_path.display());

    let schedule_path = config.schedule_path();
    if schedule_path.exists() {
        println!("  Keeping existing schedule at {}", schedule_path.display());
    } else {
        if let Some(parent) = schedule_path.parent() {
            ensure_dir(parent);
        }
        let sample = StaticScheduleStore::from_raw(sample_schedules())?;
        let json = serde_json::to_string_pretty(&sample.to_raw())?;
        std::fs::write(&schedule_path, json)
            .with_context(|| format!("Failed to write {}", schedule_path.display()))?;
        println!("  Created sample schedule at {}", schedule_path.display());
    }

    println!("\n{} powerbot is ready!", LOGO);
    println!("\nNext steps:");
    println!("  1. Put the real outage schedule into {}", schedule_path.display());
    println!(
        "  2. Set channels.telegram.token in the config (or {})",
        TELEGRAM_TOKEN_ENV
    );
    println!("  3. Run: powerbot gateway");
    Ok(())
}

fn sample_schedules() -> RawSchedules {
    let day = |events: &[(u8, u8, bool)]| -> Vec<ScheduleEvent> {
        events
            .iter()
            .map(|&(h, m, on)| ScheduleEvent::new(h, m, on))
            .collect()
    };
    RawSchedules::from([
        (
            "2026-02-14".to_string(),
            day(&[(0, 0, true), (6, 30, false), (9, 30, true)]),
        ),
        (
            "2026-02-15".to_string(),
            day(&[
                (0, 0, true),
                (10, 30, false),
                (13, 0, true),
                (17, 30, false),
                (20, 0, true),
            ]),
        ),
        ("2026-02-16".to_string(), day(&[(0, 0, true)])),
    ])
}

// ============================================================================
// Queries
// ============================================================================

fn cmd_status(config_path: &Path, at: Option<&str>) -> Result<()> {
    let (config, engine) = load_engine(config_path)?;
    let now = resolve_now(at, config.tz())?;
    println!("{}", render::to_plain_text(&render::render_power_now(&engine.get_status(now))));
    Ok(())
}

fn cmd_timer(config_path: &Path, at: Option<&str>) -> Result<()> {
    let (config, engine) = load_engine(config_path)?;
    let now = resolve_now(at, config.tz())?;
    let snapshot = engine.get_status(now);
    println!(
        "{}",
        render::to_plain_text(&render::render_timer(&snapshot, now, &config.group.id))
    );
    Ok(())
}

fn cmd_schedule(config_path: &Path, date: Option<&str>, tomorrow: bool) -> Result<()> {
    let (config, engine) = load_engine(config_path)?;
    let today = now_in(config.tz()).date_naive();
    let date = match date {
        Some(d) => engine.store().lookup(d)?.0,
        None if tomorrow => today + Duration::days(1),
        None => today,
    };
    let intervals = engine.get_intervals_for_date(date);
    println!(
        "{}",
        render::to_plain_text(&render::render_schedule(date, intervals.as_deref()))
    );
    Ok(())
}

// ============================================================================
// Stats
// ============================================================================

fn cmd_stats_show(config_path: &Path) -> Result<()> {
    let (config, engine) = load_engine(config_path)?;
    let stats = StatsStore::open(config.stats_path());
    let msg = render::render_stats(&engine, &stats.entries(), &stats.summary(), &config.group.id);
    println!("{}", render::to_plain_text(&msg));
    Ok(())
}

fn cmd_stats_record(config_path: &Path, date: Option<&str>) -> Result<()> {
    let (config, engine) = load_engine(config_path)?;
    let (date, schedule) = match date {
        Some(d) => engine.store().lookup(d)?,
        None => {
            let today = now_in(config.tz()).date_naive();
            (today, engine.store().get_schedule(today))
        }
    };
    let mut stats = StatsStore::open(config.stats_path());
    let recorded = stats.record_from_schedule(date, schedule);
    if recorded.is_sentinel() {
        println!("  No schedule for {}, recorded as no data", date);
    } else {
        println!(
            "  Recorded {}: {:.1} h with power, {:.1} h without",
            date, recorded.hours_with_power, recorded.hours_without_power
        );
    }
    Ok(())
}

fn cmd_stats_cleanup(config_path: &Path) -> Result<()> {
    let config = load_validated_config(config_path)?;
    let mut stats = StatsStore::open(config.stats_path());
    let removed = stats.cleanup_old_days(now_in(config.tz()).date_naive());
    println!("  Removed {} old day(s)", removed);
    Ok(())
}

fn cmd_stats_range(config_path: &Path, from: &str, to: &str) -> Result<()> {
    let (config, engine) = load_engine(config_path)?;
    let (from, to) = (parse_date(from)?, parse_date(to)?);
    if from > to {
        bail!("'from' ({}) is after 'to' ({})", from, to);
    }
    let days = aggregate_range(engine.store(), from, to);
    let summary = summarize(days.iter().map(|(_, s)| s));
    let msg = render::render_stats(&engine, &days, &summary, &config.group.id);
    println!("{}", render::to_plain_text(&msg));
    Ok(())
}

// ============================================================================
// Gateway
// ============================================================================

fn cmd_gateway(config_path: &Path) -> Result<()> {
    let (config, engine) = load_engine(config_path)?;
    let engine = Arc::new(engine);

    let Some(token) = config.telegram_token() else {
        bail!(
            "No Telegram token configured. Set channels.telegram.token or {}",
            TELEGRAM_TOKEN_ENV
        );
    };
    if !config.channels.telegram.enabled {
        bail!("Telegram channel is disabled (channels.telegram.enabled = false)");
    }

    println!("{} Starting powerbot for group {}...", LOGO, config.group.id);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundMessage>();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundMessage>();

        let mut stats_store = StatsStore::open(config.stats_path());
        stats_store.seed_if_new(&engine, now_in(config.tz()).date_naive());
        let stats = Arc::new(Mutex::new(stats_store));

        let maintenance = MaintenanceJob::new(
            &config.stats.maintenance_cron,
            engine.clone(),
            stats.clone(),
        )?;
        if let Some(next) = maintenance.next_run_after(now_in(config.tz())) {
            println!("  Maintenance: next run at {}", next.format("%Y-%m-%d %H:%M"));
        }

        let mut bot_loop = BotLoop::new(
            inbound_rx,
            outbound_tx,
            engine.clone(),
            stats.clone(),
            config.group.clone(),
        );

        let mut telegram = TelegramChannel::new(config.channels.telegram.clone(), token, inbound_tx);
        telegram.start().await?;
        println!("  Channel enabled: {}", telegram.name());

        let telegram = Arc::new(Mutex::new(telegram));
        let sender = telegram.clone();
        let outbound = async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = sender.lock().await.send(&msg).await {
                    error!("Failed to deliver reply to {}: {:#}", msg.chat_id, e);
                }
            }
        };

        tokio::select! {
            _ = bot_loop.run() => {
                info!("Bot loop ended");
            }
            _ = outbound => {
                info!("Outbound delivery ended");
            }
            _ = maintenance.run() => {
                warn!("Maintenance loop ended");
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
            }
        }

        bot_loop.stop();
        let mut telegram = telegram.lock().await;
        if telegram.is_running() {
            telegram.stop().await?;
        }
        Ok::<(), anyhow::Error>(())
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn load_validated_config(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        warn!(
            "No config at {}, using defaults (run `powerbot onboard`)",
            config_path.display()
        );
    }
    let config = load_config(Some(config_path));
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load the config and build the engine over the schedule file.
fn load_engine(config_path: &Path) -> Result<(Config, StatusEngine)> {
    let config = load_validated_config(config_path)?;
    let store = StaticScheduleStore::load(&config.schedule_path())?;
    let engine = StatusEngine::new(Arc::new(store), config.tz())
        .with_missing_policy(config.schedule.missing_policy);
    Ok((config, engine))
}

/// `--at` as RFC 3339, or `HH:MM` on today's date in the operating offset.
fn resolve_now(at: Option<&str>, tz: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let now = now_in(tz);
    let Some(at) = at else {
        return Ok(now);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(at) {
        return Ok(ts.with_timezone(&tz));
    }
    let time = NaiveTime::parse_from_str(at, "%H:%M")
        .with_context(|| format!("'{}' is neither RFC 3339 nor HH:MM", at))?;
    now.date_naive()
        .and_time(time)
        .and_local_timezone(tz)
        .single()
        .context("Ambiguous local time")
}
