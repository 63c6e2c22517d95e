//! Timestamp parsing for the CSV time column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Integers above this magnitude are taken as epoch milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a timestamp cell into UTC milliseconds.
///
/// Offsets are converted to UTC; naive values are read as UTC.
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    parse_timestamp(raw).map(|dt| dt.timestamp_millis())
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(epoch) = raw.parse::<i64>() {
        return from_epoch(epoch as f64);
    }
    // Float columns come through as e.g. "1704153600.0".
    if raw.contains('.') {
        if let Ok(epoch) = raw.parse::<f64>() {
            return from_epoch(epoch);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

fn from_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let millis = if epoch.abs() > EPOCH_MILLIS_THRESHOLD as f64 {
        epoch
    } else {
        epoch * 1000.0
    };
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_dates_are_midnight_utc() {
        let expected = ymd_hms(2024, 1, 2, 0, 0, 0);
        assert_eq!(parse_timestamp_millis("2024-01-02"), Some(expected));
        assert_eq!(parse_timestamp_millis("2024.01.02"), Some(expected));
        assert_eq!(parse_timestamp_millis("2024/01/02"), Some(expected));
    }

    #[test]
    fn test_offsets_are_converted() {
        assert_eq!(
            parse_timestamp_millis("2024-01-02 09:30:00-05:00"),
            Some(ymd_hms(2024, 1, 2, 14, 30, 0))
        );
        assert_eq!(
            parse_timestamp_millis("2024-01-02T14:30:00Z"),
            Some(ymd_hms(2024, 1, 2, 14, 30, 0))
        );
    }

    #[test]
    fn test_naive_datetimes() {
        assert_eq!(
            parse_timestamp_millis("2024-01-02 14:30:00"),
            Some(ymd_hms(2024, 1, 2, 14, 30, 0))
        );
        assert_eq!(
            parse_timestamp_millis("2024.01.02 14:30"),
            Some(ymd_hms(2024, 1, 2, 14, 30, 0))
        );
    }

    #[test]
    fn test_epoch_seconds_and_millis() {
        assert_eq!(parse_timestamp_millis("1704153600"), Some(1_704_153_600_000));
        assert_eq!(
            parse_timestamp_millis("1704153600000"),
            Some(1_704_153_600_000)
        );
    }

    #[test]
    fn test_float_epochs() {
        assert_eq!(
            parse_timestamp_millis("1704153600.0"),
            Some(1_704_153_600_000)
        );
        assert_eq!(
            parse_timestamp_millis("1704153600.5"),
            Some(1_704_153_600_500)
        );
        assert_eq!(
            parse_timestamp_millis("1704153600000.0"),
            Some(1_704_153_600_000)
        );
        assert_eq!(parse_timestamp_millis("NaN"), None);
    }

    #[test]
    fn test_us_month_first_dates() {
        assert_eq!(
            parse_timestamp_millis("01/03/2024"),
            Some(ymd_hms(2024, 1, 3, 0, 0, 0))
        );
        assert_eq!(
            parse_timestamp_millis("12/31/2023 16:00"),
            Some(ymd_hms(2023, 12, 31, 16, 0, 0))
        );
        assert_eq!(
            parse_timestamp_millis("01/03/2024 09:30:15"),
            Some(ymd_hms(2024, 1, 3, 9, 30, 15))
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(parse_timestamp_millis("yesterday"), None);
        assert_eq!(parse_timestamp_millis(""), None);
    }
}
