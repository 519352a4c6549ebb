//! Shared parsing utilities for catalog rows.
//!
//! Timestamp and numeric field parsing used by the CSV loader.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Naive layouts tried after RFC 3339, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses an event timestamp.
///
/// Accepts RFC 3339 (`2024-01-15T14:30:00.120Z`), space-separated with an
/// offset (`2024-01-15 14:30:00+00:00`), naive date-times in UTC, and bare
/// dates (midnight UTC). Anything else is rejected rather than guessed.
#[must_use]
pub fn parse_event_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses a finite float. Returns `None` for empty, `NaN` or infinite
/// values.
#[must_use]
pub fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a latitude/longitude pair, rejecting out-of-range values.
#[must_use]
pub fn parse_lat_lon(lat: &str, lon: &str) -> Option<(f64, f64)> {
    let latitude = parse_finite(lat)?;
    let longitude = parse_finite(lon)?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }
    Some((latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let dt = parse_event_time("2024-01-15T14:30:00.000Z").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_offset_and_converts_to_utc() {
        let dt = parse_event_time("2024-01-15 14:30:00+02:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 12:30:00 UTC");
    }

    #[test]
    fn parses_naive_forms() {
        let dt = parse_event_time("2024-01-15 14:30:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
        let dt = parse_event_time("2024-01-15T14:30:00.250").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let dt = parse_event_time("1906-04-18").unwrap();
        assert_eq!(dt.to_string(), "1906-04-18 00:00:00 UTC");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_event_time("").is_none());
        assert!(parse_event_time("yesterday").is_none());
        assert!(parse_event_time("2024-13-40").is_none());
    }

    #[test]
    fn rejects_non_finite_numbers() {
        assert!(parse_finite("nan").is_none());
        assert!(parse_finite("").is_none());
        assert!((parse_finite(" 4.5 ").unwrap() - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(parse_lat_lon("91", "10").is_none());
        assert!(parse_lat_lon("10", "-181").is_none());
        assert_eq!(parse_lat_lon("-33.5", "-70.6"), Some((-33.5, -70.6)));
    }
}
