// Time types and calendar helpers used across the engine
//
// Every engine operation receives `now` explicitly so that batch jobs and
// tests stay deterministic. The system clock is only read at the edges
// (RPC handlers and the binary).

use chrono::{DateTime, Datelike, Utc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

// Calendar month encoded as YYYYMM, used to bucket monthly purchase totals
pub type MonthKey = u32;

#[inline]
pub fn get_current_time() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}

fn to_datetime(timestamp: TimestampSeconds) -> DateTime<Utc> {
    let secs = i64::try_from(timestamp).unwrap_or(i64::MAX);
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// UTC calendar month of a timestamp, as YYYYMM
pub fn month_key(timestamp: TimestampSeconds) -> MonthKey {
    let date = to_datetime(timestamp);
    date.year().max(0) as u32 * 100 + date.month()
}

/// UTC calendar date of a timestamp, as YYYY-MM-DD
pub fn date_label(timestamp: TimestampSeconds) -> String {
    to_datetime(timestamp).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key() {
        // 2024-01-31T23:59:59Z
        assert_eq!(month_key(1_706_745_599), 202401);
        // 2024-02-01T00:00:00Z
        assert_eq!(month_key(1_706_745_600), 202402);
        assert_eq!(month_key(0), 197001);
    }

    #[test]
    fn test_date_label() {
        assert_eq!(date_label(1_706_745_600), "2024-02-01");
    }
}
