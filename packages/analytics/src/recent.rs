//! Recent-activity summarizer.

use chrono::{DateTime, TimeDelta, Utc};
use quake_forecast_analytics_models::{RecentActivity, RecentActivitySummary, SignificantSource};
use quake_forecast_catalog_models::{Event, FELT_MAGNITUDE};

/// Length of the trailing window, in days.
pub const WINDOW_DAYS: i64 = 365;

/// Summarizes the trailing year of a region's events.
///
/// If no significant event falls inside the window, the newest
/// significant event from the whole history is reported instead and
/// flagged as [`SignificantSource::History`].
#[must_use]
pub fn summarize(region_id: &str, events: &[Event], now: DateTime<Utc>) -> RecentActivity {
    if events.is_empty() {
        return RecentActivity::NoRegionData;
    }

    let window_start = now - TimeDelta::days(WINDOW_DAYS);
    let recent: Vec<&Event> = events
        .iter()
        .filter(|e| e.occurred_at >= window_start && e.magnitude >= FELT_MAGNITUDE)
        .collect();
    let recent_significant: Vec<&Event> =
        recent.iter().copied().filter(|e| e.is_significant()).collect();

    let latest = newest(recent.iter().copied());
    let (latest_significant, significant_source) =
        match newest(recent_significant.iter().copied()) {
            Some(event) => (Some(event), Some(SignificantSource::Window)),
            None => {
                let fallback = newest(events.iter().filter(|e| e.is_significant()));
                (fallback, fallback.map(|_| SignificantSource::History))
            }
        };

    let days_since = |e: &Event| (now - e.occurred_at).num_days();

    RecentActivity::Summary(RecentActivitySummary {
        region_id: region_id.to_string(),
        window_start,
        total_recent: recent.len(),
        significant_recent: recent_significant.len(),
        days_since_latest: latest.map(days_since),
        latest: latest.cloned(),
        days_since_significant: latest_significant.map(days_since),
        latest_significant: latest_significant.cloned(),
        significant_source,
    })
}

/// Newest event by timestamp; later input wins ties.
fn newest<'a>(events: impl Iterator<Item = &'a Event>) -> Option<&'a Event> {
    events.max_by_key(|e| e.occurred_at)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use quake_forecast_catalog_models::Zone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn event(days_ago: i64, magnitude: f64) -> Event {
        Event {
            occurred_at: now() - TimeDelta::days(days_ago),
            latitude: 38.0,
            longitude: 23.0,
            depth_km: 10.0,
            magnitude,
            place: Some(format!("{days_ago} days ago")),
            zone: Zone::MediterraneanHimalayan,
        }
    }

    fn summary(activity: RecentActivity) -> RecentActivitySummary {
        match activity {
            RecentActivity::Summary(summary) => summary,
            RecentActivity::NoRegionData => panic!("expected a summary"),
        }
    }

    #[test]
    fn empty_region_has_no_data() {
        assert_eq!(summarize("Greece", &[], now()), RecentActivity::NoRegionData);
    }

    #[test]
    fn counts_window_events_by_threshold() {
        let events = vec![
            event(400, 5.5),
            event(300, 3.4),
            event(120, 4.2),
            event(30, 3.1),
            event(10, 2.5),
        ];
        let s = summary(summarize("Greece", &events, now()));

        assert_eq!(s.total_recent, 3);
        assert_eq!(s.significant_recent, 1);
        assert_eq!(s.days_since_latest, Some(30));
        assert_eq!(s.days_since_significant, Some(120));
        assert_eq!(s.significant_source, Some(SignificantSource::Window));
    }

    #[test]
    fn falls_back_to_history_for_significant_event() {
        let events = vec![event(2000, 4.8), event(900, 6.1), event(50, 3.3)];
        let s = summary(summarize("Greece", &events, now()));

        assert_eq!(s.total_recent, 1);
        assert_eq!(s.significant_recent, 0);
        assert_eq!(s.days_since_significant, Some(900));
        assert_eq!(s.significant_source, Some(SignificantSource::History));
        assert!((s.latest_significant.unwrap().magnitude - 6.1).abs() < f64::EPSILON);
    }

    #[test]
    fn region_with_only_old_minor_events_reports_zero_counts() {
        let events = vec![event(800, 3.2), event(600, 3.9)];
        let s = summary(summarize("Greece", &events, now()));

        assert_eq!(s.total_recent, 0);
        assert!(s.latest.is_none());
        assert!(s.latest_significant.is_none());
        assert!(s.significant_source.is_none());
    }

    #[test]
    fn window_start_is_inclusive() {
        let events = vec![event(365, 4.0)];
        let s = summary(summarize("Greece", &events, now()));
        assert_eq!(s.total_recent, 1);
        assert_eq!(s.days_since_latest, Some(365));
    }
}
