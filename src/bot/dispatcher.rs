//! Dispatch loop: turns inbound chat messages into replies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::commands::{Command, Day};
use super::render;
use crate::bus::events::{InboundMessage, OutboundMessage};
use crate::config::schema::GroupConfig;
use crate::schedule::engine::StatusEngine;
use crate::stats::store::StatsStore;
use crate::utils::helpers::now_in;

/// Consumes inbound messages and answers each with one reply.
pub struct BotLoop {
    inbound_rx: UnboundedReceiver<InboundMessage>,
    outbound_tx: UnboundedSender<OutboundMessage>,
    engine: Arc<StatusEngine>,
    stats: Arc<Mutex<StatsStore>>,
    group: GroupConfig,
    running: Arc<AtomicBool>,
}

impl BotLoop {
    pub fn new(
        inbound_rx: UnboundedReceiver<InboundMessage>,
        outbound_tx: UnboundedSender<OutboundMessage>,
        engine: Arc<StatusEngine>,
        stats: Arc<Mutex<StatsStore>>,
        group: GroupConfig,
    ) -> Self {
        Self {
            inbound_rx,
            outbound_tx,
            engine,
            stats,
            group,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process messages until the bus closes or [`BotLoop::stop`] is called.
    pub async fn run(&mut self) {
        self.running.store(true, Ordering::SeqCst);
        info!("Bot loop started for group {}", self.group.id);

        while self.running.load(Ordering::SeqCst) {
            let Some(msg) = self.inbound_rx.recv().await else {
                info!("Inbound bus closed");
                break;
            };
            let now = now_in(self.engine.timezone());
            let reply = self.handle(&msg, now).await;
            if self.outbound_tx.send(reply).is_err() {
                warn!("Outbound bus closed, dropping reply to {}", msg.chat_id);
                break;
            }
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Build the reply for one message.
    pub async fn handle(&self, msg: &InboundMessage, now: DateTime<FixedOffset>) -> OutboundMessage {
        let command = Command::parse(&msg.content).unwrap_or(Command::Help);
        debug!(
            "{}:{} from {} at {} -> {:?}",
            msg.channel, msg.chat_id, msg.sender, msg.received_at, command
        );
        let content = self.respond(command, now).await;
        let reply = OutboundMessage::new(&msg.channel, &msg.chat_id, &content);
        match command {
            Command::Start | Command::Help => reply.with_menu(),
            _ => reply,
        }
    }

    async fn respond(&self, command: Command, now: DateTime<FixedOffset>) -> String {
        match command {
            Command::Start => render::render_welcome(&self.group.id),
            Command::Help => render::render_help(),
            Command::PowerNow => render::render_power_now(&self.engine.get_status(now)),
            Command::Timer => {
                render::render_timer(&self.engine.get_status(now), now, &self.group.id)
            }
            Command::FullSchedule(day) => {
                let date = match day {
                    Day::Today => now.date_naive(),
                    Day::Tomorrow => now.date_naive() + Duration::days(1),
                };
                let intervals = self.engine.get_intervals_for_date(date);
                render::render_schedule(date, intervals.as_deref())
            }
            Command::Statistics => {
                let mut stats = self.stats.lock().await;
                stats.cleanup_old_days(now.date_naive());
                let days = stats.entries();
                render::render_stats(&self.engine, &days, &stats.summary(), &self.group.id)
            }
            Command::OpenWebsite => render::render_site(&self.group.site_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tokio::sync::mpsc;

    use super::*;
    use crate::schedule::store::StaticScheduleStore;
    use crate::schedule::types::{DaySchedule, ScheduleEvent};
    use crate::utils::helpers::fixed_offset;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        date(day)
            .and_hms_opt(hour, minute, 0)
            .unwrap()
            .and_local_timezone(fixed_offset(2))
            .unwrap()
    }

    struct Harness {
        bot: BotLoop,
        inbound_tx: UnboundedSender<InboundMessage>,
        outbound_rx: UnboundedReceiver<OutboundMessage>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let mut store = StaticScheduleStore::new();
        store.insert(
            DaySchedule::new(
                date(16),
                vec![ScheduleEvent::new(0, 0, true)],
            )
            .unwrap(),
        );
        store.insert(
            DaySchedule::new(
                date(17),
                vec![ScheduleEvent::new(0, 0, true), ScheduleEvent::new(8, 0, false)],
            )
            .unwrap(),
        );
        let engine = Arc::new(StatusEngine::new(Arc::new(store), fixed_offset(2)));

        let dir = tempfile::tempdir().unwrap();
        let stats = Arc::new(Mutex::new(StatsStore::open(dir.path().join("stats.json"))));

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Harness {
            bot: BotLoop::new(inbound_rx, outbound_tx, engine, stats, GroupConfig::default()),
            inbound_tx,
            outbound_rx,
            _dir: dir,
        }
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage::new("telegram", "42", "42", text)
    }

    #[tokio::test]
    async fn test_timer_uses_cross_midnight_end() {
        let h = harness();
        let reply = h.bot.handle(&message("⏱️ Timer"), at(16, 23, 30)).await;
        assert_eq!(reply.chat_id, "42");
        assert!(reply.content.contains("at 08:00"));
        assert!(reply.content.contains("8 h 30 min 00 s"));
        assert!(!reply.show_menu);
    }

    #[tokio::test]
    async fn test_start_shows_menu() {
        let h = harness();
        let reply = h.bot.handle(&message("/start"), at(16, 12, 0)).await;
        assert!(reply.show_menu);
        assert!(reply.content.contains("3.1"));
    }

    #[tokio::test]
    async fn test_unknown_text_gets_help() {
        let h = harness();
        let reply = h.bot.handle(&message("what?"), at(16, 12, 0)).await;
        assert!(reply.content.contains("/timer"));
        assert!(reply.show_menu);
    }

    #[tokio::test]
    async fn test_tomorrow_schedule() {
        let h = harness();
        let reply = h.bot.handle(&message("📅 Tomorrow"), at(16, 12, 0)).await;
        assert!(reply.content.contains("17.02"));
        assert!(reply.content.contains("08:00-00:00 ❌"));
    }

    #[tokio::test]
    async fn test_statistics_prunes_and_renders() {
        let h = harness();
        {
            let mut stats = h.bot.stats.lock().await;
            stats.record(date(10), Default::default());
            stats.record(
                date(16),
                crate::schedule::stats::DailyStats {
                    hours_with_power: 24.0,
                    hours_without_power: 0.0,
                },
            );
        }
        let reply = h.bot.handle(&message("/stats"), at(16, 12, 0)).await;
        assert!(reply.content.contains("2026-02-16"));
        assert!(!reply.content.contains("2026-02-10"));
    }

    #[tokio::test]
    async fn test_run_replies_until_bus_closes() {
        let Harness {
            mut bot,
            inbound_tx,
            mut outbound_rx,
            _dir,
        } = harness();

        inbound_tx.send(message("/site")).unwrap();
        drop(inbound_tx);
        bot.run().await;

        let reply = outbound_rx.recv().await.unwrap();
        assert!(reply.content.contains("off.energy.mk.ua"));
    }
}
