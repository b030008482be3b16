//! Time-of-day window classification
//!
//! Sleep windows routinely cross midnight (fall asleep 23:00, wake 07:00), so
//! membership cannot be a plain range check. All times are minutes since local
//! midnight; a window whose start exceeds its end is treated as wrapping.

use chrono::TimeZone;
use chrono_tz::Tz;

/// Minutes in a civil day
pub const MINUTES_PER_DAY: u32 = 1440;

/// Parse an "HH:MM" wall-clock label into minutes since midnight.
///
/// Returns None for anything that is not a valid 24-hour clock reading.
pub fn minutes_of_day(clock: &str) -> Option<u32> {
    let (hours, minutes) = clock.split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Whether a time-of-day falls inside a possibly midnight-crossing window.
///
/// Both endpoints are inclusive. When `start > end` the window wraps midnight
/// and membership is `t >= start || t <= end`.
pub fn is_within(t: u32, start: u32, end: u32) -> bool {
    if start > end {
        t >= start || t <= end
    } else {
        (start..=end).contains(&t)
    }
}

/// Resolve a pair of optional "HH:MM" labels into a minutes-of-day window.
pub fn clock_range(start: Option<&str>, end: Option<&str>) -> Option<(u32, u32)> {
    let start = minutes_of_day(start?)?;
    let end = minutes_of_day(end?)?;
    Some((start, end))
}

/// Format an epoch-millisecond instant as a local "HH:MM" label.
///
/// Falls back to an empty string for out-of-range timestamps rather than
/// failing the day's run.
pub fn format_clock(epoch_ms: i64, tz: Tz) -> String {
    tz.timestamp_millis_opt(epoch_ms)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}
