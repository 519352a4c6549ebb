//! Data-quality scoring for a region's significant events.

use chrono::{DateTime, Utc};
use quake_forecast_analytics_models::DataQuality;
use quake_forecast_catalog_models::Event;

/// Scores how well `significant` supports statistical analysis.
///
/// Four components of up to 25 points each: time span covered, event
/// count, age of the newest event relative to `now`, and magnitude
/// range. The total is capped at 100.
#[must_use]
pub fn assess(significant: &[&Event], now: DateTime<Utc>) -> DataQuality {
    let (Some(first), Some(last)) = (
        significant.iter().map(|e| e.occurred_at).min(),
        significant.iter().map(|e| e.occurred_at).max(),
    ) else {
        return DataQuality {
            span: 0,
            volume: 0,
            recency: 0,
            magnitude_range: 0,
            score: 0,
        };
    };

    #[allow(clippy::cast_precision_loss)]
    let span_years = (last - first).num_days() as f64 / 365.25;
    let span = match span_years {
        y if y >= 50.0 => 25,
        y if y >= 20.0 => 20,
        y if y >= 10.0 => 15,
        _ => 10,
    };

    let volume = match significant.len() {
        n if n >= 100 => 25,
        n if n >= 50 => 20,
        n if n >= 20 => 15,
        _ => 10,
    };

    let recency = match (now - last).num_days() {
        d if d <= 365 => 25,
        d if d <= 1825 => 20,
        d if d <= 3650 => 15,
        _ => 5,
    };

    let max = significant.iter().map(|e| e.magnitude).fold(f64::MIN, f64::max);
    let min = significant.iter().map(|e| e.magnitude).fold(f64::MAX, f64::min);
    let magnitude_range = match max - min {
        r if r >= 3.0 => 25,
        r if r >= 2.0 => 20,
        r if r >= 1.0 => 15,
        _ => 10,
    };

    DataQuality {
        span,
        volume,
        recency,
        magnitude_range,
        score: (span + volume + recency + magnitude_range).min(100),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone as _};
    use quake_forecast_catalog_models::Zone;

    use super::*;

    fn event(occurred_at: DateTime<Utc>, magnitude: f64) -> Event {
        Event {
            occurred_at,
            latitude: 0.0,
            longitude: 0.0,
            depth_km: 10.0,
            magnitude,
            place: None,
            zone: Zone::Global,
        }
    }

    #[test]
    fn long_rich_recent_history_scores_full_marks() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let events: Vec<Event> = (0..120)
            .map(|i| {
                let magnitude = if i == 0 { 7.5 } else { 4.0 };
                event(now - TimeDelta::days(200 * i64::from(i)) - TimeDelta::days(10), magnitude)
            })
            .collect();
        let refs: Vec<&Event> = events.iter().collect();

        let quality = assess(&refs, now);
        assert_eq!(quality.score, 100);
        assert_eq!(quality.span, 25);
        assert_eq!(quality.volume, 25);
        assert_eq!(quality.recency, 25);
        assert_eq!(quality.magnitude_range, 25);
    }

    #[test]
    fn short_sparse_stale_history_scores_minimum_bands() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let start = now - TimeDelta::days(365 * 15);
        let events: Vec<Event> = (0..5)
            .map(|i| event(start + TimeDelta::days(30 * i), 4.2))
            .collect();
        let refs: Vec<&Event> = events.iter().collect();

        let quality = assess(&refs, now);
        assert_eq!(quality.span, 10);
        assert_eq!(quality.volume, 10);
        assert_eq!(quality.recency, 5);
        assert_eq!(quality.magnitude_range, 10);
        assert_eq!(quality.score, 35);
    }

    #[test]
    fn empty_input_scores_zero() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(assess(&[], now).score, 0);
    }
}
