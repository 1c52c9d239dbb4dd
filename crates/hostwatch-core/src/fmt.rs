//! Shared formatting helpers for cards, charts and tables.
//!
//! Pure functions only (no ratatui styles, no layout). Anything that depends
//! on "now" has an `_at` variant taking the current epoch seconds explicitly
//! so callers evaluating a whole render pass can use a single instant.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, TimeZone};

/// Current wall-clock time as fractional epoch seconds.
pub fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn local_datetime(ts: f64) -> Option<DateTime<Local>> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.floor() as i64;
    Local.timestamp_opt(secs, 0).single()
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Format epoch seconds as an absolute local timestamp: `"2026-02-07 17:00:00"`.
///
/// Returns `"----"` for timestamps that cannot be represented.
pub fn format_timestamp(ts: f64) -> String {
    local_datetime(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "----".to_string())
}

/// Minute-resolution local timestamp used for chart axis labels:
/// `"2026-02-07 17:00"`.
pub fn format_timestamp_minutes(ts: f64) -> String {
    local_datetime(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "----".to_string())
}

/// Relative age of `ts` as seen at `now`, coarsened to a single unit.
///
/// `"45s ago"`, `"2min ago"`, `"2h ago"`, `"2 days ago"`. Units are floored;
/// timestamps in the future read as `"0s ago"`.
pub fn time_ago_at(ts: f64, now: f64) -> String {
    let seconds = ((now - ts).floor() as i64).max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if seconds < 60 {
        format!("{}s ago", seconds)
    } else if minutes < 60 {
        format!("{}min ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else {
        format!("{} days ago", days)
    }
}

/// [`time_ago_at`] evaluated against the wall clock at call time.
pub fn time_ago(ts: f64) -> String {
    time_ago_at(ts, now_epoch())
}

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// Format a size given in GB, picking the unit by magnitude.
///
/// `> 1024` → TB, `> 1` → GB, `> 1/1024` → MB, otherwise KB. Always an
/// integer: `"2TB"`, `"500GB"`, `"512MB"`, `"10KB"`.
pub fn format_gb(value: f64) -> String {
    if value > 1024.0 {
        format!("{:.0}TB", value / 1024.0)
    } else if value > 1.0 {
        format!("{:.0}GB", value)
    } else if value > 1.0 / 1024.0 {
        format!("{:.0}MB", value * 1024.0)
    } else {
        format!("{:.0}KB", value * 1024.0 * 1024.0)
    }
}

/// Format MiB as whole GiB, the unit used on card rows and GPU boxes.
pub fn format_mib_as_gib(mib: f64) -> String {
    format!("{:.0}", mib / 1024.0)
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Truncate string to max characters with unicode ellipsis (`…`).
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
