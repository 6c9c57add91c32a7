//! HTML message bodies for the bot and plain-text output for the CLI.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate};
use html_escape::encode_text;
use regex::Regex;

use crate::schedule::engine::{StatusEngine, StatusSnapshot};
use crate::schedule::stats::{DailyStats, RangeSummary};
use crate::schedule::types::Interval;
use crate::utils::helpers::format_duration;

const RULE: &str = "──────────────────";

/// Half-hour cells per chart row.
const CHART_SLOTS: u16 = 48;

const UNAVAILABLE: &str = "<b>⚠️ Schedule is not available right now.</b>\nPlease check again later.";

fn status_text(is_power_on: bool) -> &'static str {
    if is_power_on {
        "POWER ON"
    } else {
        "POWER OFF"
    }
}

pub fn render_welcome(group_id: &str) -> String {
    format!(
        "👋 <b>Hello!</b>\nI track the outage schedule for group <b>{}</b>.\nUse the menu below.",
        encode_text(group_id)
    )
}

pub fn render_help() -> String {
    [
        "<b>Commands</b>",
        "/status - is power on now?",
        "/timer - time since and until the next change",
        "/today, /tomorrow - full schedule",
        "/stats - hours with and without power",
        "/site - grid operator website",
    ]
    .join("\n")
}

pub fn render_site(url: &str) -> String {
    format!("Grid operator website:\n{}", encode_text(url))
}

/// Short "is power on now?" answer.
pub fn render_power_now(snapshot: &StatusSnapshot) -> String {
    match snapshot.window() {
        None => UNAVAILABLE.to_string(),
        Some(window) => format!(
            "<b>Status: {} {}</b>\nUntil: <code>{}</code>",
            status_text(window.is_power_on),
            if window.is_power_on { "🟢" } else { "🔴" },
            encode_text(&window.end_label)
        ),
    }
}

/// Countdown block with elapsed and remaining time.
pub fn render_timer(snapshot: &StatusSnapshot, now: DateTime<FixedOffset>, group_id: &str) -> String {
    let Some(window) = snapshot.window() else {
        return UNAVAILABLE.to_string();
    };
    let on = window.is_power_on;
    let status = status_text(on);

    let mut msg = String::new();
    msg.push_str(if on { "🟢✅\n" } else { "🔴❌\n" });
    msg.push_str(&format!("<b>⏱️ {}</b>\n{}\n", status, RULE));
    msg.push_str(&format!("🕐 Now: <code>{}</code>\n\n", now.format("%H:%M:%S")));
    msg.push_str(&format!(
        "{} {} for:\n<b>{}</b>\n\n",
        if on { "✅" } else { "❌" },
        status,
        format_duration(window.elapsed(now))
    ));
    msg.push_str(&format!(
        "⏳ Left until {}:\n<b>{}</b>\n\n",
        if on { "the outage" } else { "power returns" },
        format_duration(window.remaining(now))
    ));
    msg.push_str(&format!(
        "{}:\n👉 <b>at {}</b>\n{}\n",
        if on { "🔴 Next outage" } else { "🟢 Power back" },
        encode_text(&window.end_label),
        RULE
    ));
    msg.push_str(&format!("📍 Group: <b>{}</b>", encode_text(group_id)));
    msg
}

/// Interval listing for one day.
pub fn render_schedule(date: NaiveDate, intervals: Option<&[Interval]>) -> String {
    let header = format!("📅 <i>Schedule for {}:</i>", date.format("%d.%m"));
    let Some(intervals) = intervals else {
        return format!("{}\n{}", header, UNAVAILABLE);
    };
    let lines: Vec<String> = intervals
        .iter()
        .map(|i| {
            format!(
                "{}-{} {}",
                i.start_label(),
                i.end_label(),
                if i.power_on { "✅" } else { "❌" }
            )
        })
        .collect();
    format!("{}\n{}", header, lines.join("\n"))
}

/// One chart row: a cell per half hour, `█` for power, `░` for outage,
/// `·` when the day has no schedule.
pub fn chart_row(engine: &StatusEngine, date: NaiveDate) -> String {
    (0..CHART_SLOTS)
        .map(|slot| match engine.status_at(date, slot * 30) {
            Some(true) => '█',
            Some(false) => '░',
            None => '·',
        })
        .collect()
}

/// Statistics report with a text chart of each recorded day.
pub fn render_stats(
    engine: &StatusEngine,
    days: &[(NaiveDate, DailyStats)],
    summary: &RangeSummary,
    group_id: &str,
) -> String {
    if days.is_empty() {
        return "No statistics recorded yet.".to_string();
    }

    let mut msg = format!("📊 <b>Statistics, group {}</b>\n", encode_text(group_id));
    for (date, stats) in days {
        if stats.is_sentinel() {
            msg.push_str(&format!("{}: no data\n", date.format("%Y-%m-%d")));
        } else {
            msg.push_str(&format!(
                "{}: ✅ {:.1} h  ❌ {:.1} h\n",
                date.format("%Y-%m-%d"),
                stats.hours_with_power,
                stats.hours_without_power
            ));
        }
    }

    if let (Some(with), Some(without)) = (summary.average_with_power, summary.average_without_power) {
        msg.push_str(&format!(
            "\nAverage over {} day(s): ✅ {:.1} h  ❌ {:.1} h\n",
            summary.days_with_data, with, without
        ));
    }

    msg.push_str("\n<pre>");
    msg.push_str("      0           6           12          18          24\n");
    for (date, _) in days {
        msg.push_str(&format!("{} {}\n", date.format("%d.%m"), chart_row(engine, *date)));
    }
    msg.push_str("</pre>");
    msg
}

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"))
}

/// Strip the tags used in bot messages and decode entities for terminal output.
pub fn to_plain_text(html: &str) -> String {
    let text = tag_pattern().replace_all(html, "");
    html_escape::decode_html_entities(&text).into_owned()
}
