//! Display formatting for stored timestamps.

use chrono::{DateTime, Utc};

fn utc(timestamp_millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp_millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Full display form used by `formattedTime` fields: `21/08/2026, 14:03:05`.
pub fn format_date_time(timestamp_millis: i64) -> String {
    utc(timestamp_millis).format("%d/%m/%Y, %H:%M:%S").to_string()
}

/// Short clock form used in notification messages: `14:03`.
pub fn format_clock(timestamp_millis: i64) -> String {
    utc(timestamp_millis).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_time() {
        // 2026-08-21 14:03:05 UTC
        assert_eq!(format_date_time(1_787_320_985_000), "21/08/2026, 14:03:05");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(1_787_320_985_000), "14:03");
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_epoch() {
        assert_eq!(format_date_time(i64::MAX), "01/01/1970, 00:00:00");
    }
}
