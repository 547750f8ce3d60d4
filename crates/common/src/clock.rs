//! Wall-clock timestamps and their display formats.
//!
//! Frames and history events carry their capture time as fractional seconds
//! since the Unix epoch. This module converts those values for display:
//! - `HH:MM:SS.mmm` for history lines
//! - `YYYYmmdd_HHMMSS` for session identifiers
//! - `YYYYmmdd_HHMMSS_mmm` for saved frame filenames

use chrono::{DateTime, Local, TimeZone, Utc};

/// Seconds since the Unix epoch, with microsecond resolution.
pub fn now_epoch_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Convert epoch seconds into a date-time in the given zone.
///
/// Sub-second precision is kept to the microsecond. Out-of-range values
/// collapse to the epoch.
pub fn to_datetime<Tz: TimeZone>(epoch_secs: f64, tz: &Tz) -> DateTime<Tz> {
    let secs = epoch_secs.floor();
    // Microsecond rounding absorbs f64 error at current epoch magnitudes.
    let micros = (((epoch_secs - secs) * 1_000_000.0).round() as u32).min(999_999);
    DateTime::from_timestamp(secs as i64, micros * 1_000)
        .unwrap_or_default()
        .with_timezone(tz)
}

/// `HH:MM:SS.mmm` in the given zone.
pub fn format_clock_time<Tz: TimeZone>(epoch_secs: f64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    to_datetime(epoch_secs, tz)
        .format("%H:%M:%S%.3f")
        .to_string()
}

/// `YYYYmmdd_HHMMSS` in local time, used as the default session id.
pub fn session_stamp(epoch_secs: f64) -> String {
    to_datetime(epoch_secs, &Local)
        .format("%Y%m%d_%H%M%S")
        .to_string()
}

/// `YYYYmmdd_HHMMSS_mmm` in local time, used for saved frame names.
pub fn capture_stamp(epoch_secs: f64) -> String {
    to_datetime(epoch_secs, &Local)
        .format("%Y%m%d_%H%M%S_%3f")
        .to_string()
}
