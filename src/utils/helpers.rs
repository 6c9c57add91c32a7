//! Small shared helpers: paths, the operating clock, duration formatting.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref().to_path_buf();
    std::fs::create_dir_all(&path).ok();
    path
}

/// `~/.powerbot`, or `./.powerbot` when there is no home directory.
pub fn get_data_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".powerbot")
}

/// Expand a leading `~` in a configured path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Fixed offset for a whole number of hours east of UTC.
///
/// Out-of-range values fall back to UTC.
pub fn fixed_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.saturating_mul(3600)).unwrap_or_else(|| Utc.fix())
}

/// Current wall-clock time in the operating offset.
pub fn now_in(tz: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&tz)
}

/// `"3 h 07 min 12 s"`. Negative durations render as zero.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{} h {:02} min {:02} s",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(0)), "0 h 00 min 00 s");
        assert_eq!(
            format_duration(Duration::hours(2) + Duration::minutes(5) + Duration::seconds(9)),
            "2 h 05 min 09 s"
        );
        assert_eq!(format_duration(Duration::hours(31)), "31 h 00 min 00 s");
    }

    #[test]
    fn test_format_negative_duration_is_zero() {
        assert_eq!(format_duration(Duration::minutes(-5)), "0 h 00 min 00 s");
    }

    #[test]
    fn test_fixed_offset() {
        assert_eq!(fixed_offset(2).local_minus_utc(), 7200);
        assert_eq!(fixed_offset(-5).local_minus_utc(), -18000);
        assert_eq!(fixed_offset(99).local_minus_utc(), 0);
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/tmp/x.json"), PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = ensure_dir(tmp.path().join("a").join("b"));
        assert!(nested.is_dir());
    }
}
