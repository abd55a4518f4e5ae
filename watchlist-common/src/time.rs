//! Timestamp utilities

use chrono::{DateTime, Local, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Audit stamp for the record date column (`YYYYMMDD`, local clock)
pub fn record_date_stamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d").to_string()
}

/// Audit stamp for the record time column (`HHMMSS`, local clock)
pub fn record_time_stamp(at: DateTime<Local>) -> String {
    at.format("%H%M%S").to_string()
}

/// Convert seconds to duration
pub fn secs_to_duration(secs: u64) -> std::time::Duration {
    std::time::Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // After 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_record_stamps_are_zero_padded() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 4, 5, 6).unwrap();
        assert_eq!(record_date_stamp(at), "20240307");
        assert_eq!(record_time_stamp(at), "040506");
    }

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(86_400).as_secs(), 86_400);
        assert_eq!(secs_to_duration(0).as_millis(), 0);
    }
}
