//! Timestamp utilities

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar month of a timestamp as `(year, month)`, UTC
pub fn month_key(at: DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}

/// True when `earlier` falls in a calendar month strictly before the month of `later`
pub fn is_earlier_month(earlier: DateTime<Utc>, later: DateTime<Utc>) -> bool {
    month_key(earlier) < month_key(later)
}

/// First instant of the calendar month containing `at`
pub fn start_of_month(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(at)
}
