//! Live feed collaborator.
//!
//! Pulls recent events from an external catalog service, normalizes the
//! wire records into [`Event`]s and merges the ones newer than anything
//! already cataloged. Failures never propagate: [`refresh`] reports them
//! as [`LiveRefresh::Unavailable`] and leaves the catalog untouched.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use quake_forecast_catalog_models::{Event, FELT_MAGNITUDE};
use serde::{Deserialize, Serialize};

use crate::{Catalog, FeedError, retry, zone};

/// USGS FDSN event query endpoint.
pub const DEFAULT_FEED_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

/// Per-request timeout for the live feed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Depth assigned when the feed reports none.
pub const DEFAULT_DEPTH_KM: f64 = 10.0;

/// Place label assigned when the feed reports none.
pub const UNKNOWN_PLACE: &str = "Unknown location";

/// If the catalog is older than this, the feed is queried for a fixed
/// lookback instead of from the day after the newest event.
const MAX_GAP_DAYS: i64 = 60;

/// Lookback used when the catalog is stale or empty.
const LOOKBACK_DAYS: i64 = 730;

/// Date range requested from the feed (inclusive, UTC dates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedWindow {
    /// First day requested.
    pub start: NaiveDate,
    /// Last day requested.
    pub end: NaiveDate,
}

impl FeedWindow {
    /// Chooses the query window for a catalog whose newest event is
    /// `latest`.
    ///
    /// Continues from the day after `latest` when the gap to `now` is at
    /// most 60 days; otherwise (or for an empty catalog) requests the last
    /// two years.
    #[must_use]
    pub fn for_catalog(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let start = match latest {
            Some(latest) if (now - latest).num_days() <= MAX_GAP_DAYS => {
                latest + TimeDelta::days(1)
            }
            _ => now - TimeDelta::days(LOOKBACK_DAYS),
        };
        Self {
            start: start.date_naive(),
            end: now.date_naive(),
        }
    }
}

/// One event in the feed's wire schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    /// Event time as Unix epoch milliseconds.
    pub time_ms: i64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Depth in kilometers, if reported.
    pub depth_km: Option<f64>,
    /// Reported magnitude.
    pub magnitude: f64,
    /// Free-text place description, if reported.
    pub place: Option<String>,
}

impl FeedRecord {
    /// Normalizes the record into the catalog [`Event`] shape.
    ///
    /// Missing depth becomes [`DEFAULT_DEPTH_KM`], the zone is derived
    /// from coordinates. Returns `None` for out-of-range timestamps,
    /// coordinates or non-finite values.
    #[must_use]
    pub fn into_event(self) -> Option<Event> {
        let occurred_at = DateTime::from_timestamp_millis(self.time_ms)?;
        if !(-90.0..=90.0).contains(&self.latitude)
            || !(-180.0..=180.0).contains(&self.longitude)
            || !self.magnitude.is_finite()
        {
            return None;
        }
        let depth_km = self
            .depth_km
            .filter(|d| d.is_finite())
            .unwrap_or(DEFAULT_DEPTH_KM);

        Some(Event {
            occurred_at,
            latitude: self.latitude,
            longitude: self.longitude,
            depth_km,
            magnitude: self.magnitude,
            place: Some(self.place.unwrap_or_else(|| UNKNOWN_PLACE.to_string())),
            zone: zone::classify(self.latitude, self.longitude),
        })
    }
}

/// Trait implemented by live event sources.
#[async_trait]
pub trait LiveFeed: Send + Sync {
    /// Human-readable name for log messages.
    fn name(&self) -> &str;

    /// Fetches wire records for the given window.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] on transport failure, timeout, or an
    /// unusable response.
    async fn fetch(&self, window: &FeedWindow) -> Result<Vec<FeedRecord>, FeedError>;
}

/// The USGS GeoJSON event service.
#[derive(Debug, Clone)]
pub struct UsgsFeed {
    client: reqwest::Client,
    url: String,
}

impl UsgsFeed {
    /// Creates a feed client with the given endpoint and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Creates a feed client for [`DEFAULT_FEED_URL`] with
    /// [`DEFAULT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the HTTP client cannot be built.
    pub fn usgs() -> Result<Self, FeedError> {
        Self::new(DEFAULT_FEED_URL, DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl LiveFeed for UsgsFeed {
    fn name(&self) -> &str {
        "USGS"
    }

    async fn fetch(&self, window: &FeedWindow) -> Result<Vec<FeedRecord>, FeedError> {
        let start = window.start.format("%Y-%m-%d").to_string();
        let end = window.end.format("%Y-%m-%d").to_string();
        let min_magnitude = format!("{FELT_MAGNITUDE:.1}");

        log::info!("Fetching live events from {} ({start} to {end})", self.url);

        let body = retry::send_json(|| {
            self.client.get(&self.url).query(&[
                ("format", "geojson"),
                ("starttime", start.as_str()),
                ("endtime", end.as_str()),
                ("minmagnitude", min_magnitude.as_str()),
                ("orderby", "time"),
            ])
        })
        .await?;

        parse_geojson(&body)
    }
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    properties: GeoJsonProperties,
    geometry: GeoJsonGeometry,
}

#[derive(Debug, Deserialize)]
struct GeoJsonProperties {
    time: i64,
    mag: f64,
    place: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonGeometry {
    coordinates: Vec<Option<f64>>,
}

/// Extracts wire records from a GeoJSON `FeatureCollection`.
///
/// Features missing a time, magnitude or coordinate pair are dropped
/// individually.
///
/// # Errors
///
/// Returns [`FeedError::Response`] if the body has no `features` array.
pub fn parse_geojson(body: &serde_json::Value) -> Result<Vec<FeedRecord>, FeedError> {
    let features = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| FeedError::Response {
            message: "response has no 'features' array".to_string(),
        })?;

    let mut records = Vec::with_capacity(features.len());
    let mut dropped = 0usize;

    for feature in features {
        let Ok(feature) = GeoJsonFeature::deserialize(feature) else {
            dropped += 1;
            continue;
        };
        let coords = &feature.geometry.coordinates;
        let (Some(Some(longitude)), Some(Some(latitude))) = (coords.first(), coords.get(1)) else {
            dropped += 1;
            continue;
        };
        records.push(FeedRecord {
            time_ms: feature.properties.time,
            longitude: *longitude,
            latitude: *latitude,
            depth_km: coords.get(2).copied().flatten(),
            magnitude: feature.properties.mag,
            place: feature.properties.place,
        });
    }

    if dropped > 0 {
        log::warn!("Dropped {dropped} malformed live feed features");
    }

    Ok(records)
}

/// Splits off events that are not strictly newer than `latest`.
///
/// Returns the fresh events and the number rejected.
#[must_use]
pub fn reject_stale(events: Vec<Event>, latest: Option<DateTime<Utc>>) -> (Vec<Event>, usize) {
    let Some(latest) = latest else {
        return (events, 0);
    };
    let total = events.len();
    let fresh: Vec<Event> = events
        .into_iter()
        .filter(|e| e.occurred_at > latest)
        .collect();
    let stale = total - fresh.len();
    (fresh, stale)
}

/// Result of a live refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveRefresh {
    /// The feed answered; new events (possibly none) were merged.
    Merged {
        /// Wire records received.
        fetched: usize,
        /// Records that could not be normalized.
        malformed: usize,
        /// Events not newer than the catalog's latest timestamp.
        stale: usize,
        /// Events actually added to the catalog.
        added: usize,
    },
    /// The feed failed; the catalog is unchanged.
    Unavailable {
        /// Why the feed could not be used.
        reason: String,
    },
}

impl LiveRefresh {
    /// Whether the session is running on historical data only.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Fetches from `feed` and merges fresh events into `catalog`.
///
/// Never fails: feed errors are logged and reported as
/// [`LiveRefresh::Unavailable`].
pub async fn refresh(catalog: &mut Catalog, feed: &dyn LiveFeed, now: DateTime<Utc>) -> LiveRefresh {
    let latest = catalog.latest();
    let window = FeedWindow::for_catalog(latest, now);

    let records = match feed.fetch(&window).await {
        Ok(records) => records,
        Err(e) => {
            log::warn!(
                "Could not fetch live data from {}: {e}. Continuing with {} cataloged events",
                feed.name(),
                catalog.len()
            );
            return LiveRefresh::Unavailable {
                reason: e.to_string(),
            };
        }
    };

    let fetched = records.len();
    let events: Vec<Event> = records
        .into_iter()
        .filter_map(FeedRecord::into_event)
        .collect();
    let malformed = fetched - events.len();
    let (fresh, stale) = reject_stale(events, latest);
    let added = catalog.merge(fresh);

    log::info!(
        "Live feed {}: {fetched} fetched, {added} added ({stale} stale, {malformed} malformed)",
        feed.name()
    );

    LiveRefresh::Merged {
        fetched,
        malformed,
        stale,
        added,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use quake_forecast_catalog_models::Zone;
    use serde_json::json;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn record(time: DateTime<Utc>, magnitude: f64) -> FeedRecord {
        FeedRecord {
            time_ms: time.timestamp_millis(),
            longitude: 139.0,
            latitude: 35.0,
            depth_km: None,
            magnitude,
            place: None,
        }
    }

    fn cataloged(time: DateTime<Utc>) -> Event {
        record(time, 4.4).into_event().unwrap()
    }

    struct CannedFeed(Vec<FeedRecord>);

    #[async_trait]
    impl LiveFeed for CannedFeed {
        fn name(&self) -> &str {
            "canned"
        }

        async fn fetch(&self, _window: &FeedWindow) -> Result<Vec<FeedRecord>, FeedError> {
            Ok(self.0.clone())
        }
    }

    struct DownFeed;

    #[async_trait]
    impl LiveFeed for DownFeed {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(&self, _window: &FeedWindow) -> Result<Vec<FeedRecord>, FeedError> {
            Err(FeedError::Response {
                message: "timed out".to_string(),
            })
        }
    }

    #[test]
    fn window_continues_from_recent_catalog() {
        let window = FeedWindow::for_catalog(Some(at(2024, 5, 1)), at(2024, 5, 20));
        assert_eq!(window.start, at(2024, 5, 2).date_naive());
        assert_eq!(window.end, at(2024, 5, 20).date_naive());
    }

    #[test]
    fn window_uses_lookback_for_stale_or_empty_catalog() {
        let now = at(2024, 5, 20);
        let expected = (now - TimeDelta::days(730)).date_naive();
        assert_eq!(FeedWindow::for_catalog(Some(at(2020, 1, 1)), now).start, expected);
        assert_eq!(FeedWindow::for_catalog(None, now).start, expected);
    }

    #[test]
    fn normalization_defaults_depth_place_and_zone() {
        let event = record(at(2024, 1, 1), 5.2).into_event().unwrap();
        assert!((event.depth_km - DEFAULT_DEPTH_KM).abs() < f64::EPSILON);
        assert_eq!(event.place.as_deref(), Some(UNKNOWN_PLACE));
        assert_eq!(event.zone, Zone::PacificRing);
    }

    #[test]
    fn normalization_rejects_bad_coordinates() {
        let mut bad = record(at(2024, 1, 1), 5.2);
        bad.latitude = 123.0;
        assert!(bad.into_event().is_none());
    }

    #[test]
    fn parses_geojson_and_drops_malformed_features() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "properties": { "time": 1_704_067_200_000_i64, "mag": 4.7, "place": "Off the coast" },
                    "geometry": { "coordinates": [142.1, 38.2, null] }
                },
                {
                    "properties": { "time": 1_704_067_300_000_i64, "mag": null },
                    "geometry": { "coordinates": [142.1, 38.2, 12.0] }
                },
                {
                    "properties": { "time": 1_704_067_400_000_i64, "mag": 3.1 },
                    "geometry": { "coordinates": [142.1] }
                },
                {
                    "properties": { "time": 1_704_067_500_000_i64, "mag": 3.4 },
                    "geometry": { "coordinates": [-70.6, -33.4, 35.5] }
                }
            ]
        });

        let records = parse_geojson(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].depth_km, None);
        assert_eq!(records[0].place.as_deref(), Some("Off the coast"));
        assert_eq!(records[1].depth_km, Some(35.5));
        assert!((records[1].latitude - -33.4).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_features_array_is_an_error() {
        assert!(parse_geojson(&json!({ "type": "FeatureCollection" })).is_err());
    }

    #[test]
    fn stale_events_are_rejected() {
        let latest = at(2024, 3, 1);
        let events = vec![cataloged(at(2024, 2, 1)), cataloged(latest), cataloged(at(2024, 3, 2))];
        let (fresh, stale) = reject_stale(events, Some(latest));
        assert_eq!(stale, 2);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].occurred_at, at(2024, 3, 2));
    }

    #[tokio::test]
    async fn refresh_merges_only_fresh_events() {
        let mut catalog = Catalog::new(vec![cataloged(at(2024, 3, 1))]);
        let feed = CannedFeed(vec![record(at(2024, 2, 1), 4.8), record(at(2024, 3, 5), 4.1)]);

        let outcome = refresh(&mut catalog, &feed, at(2024, 3, 10)).await;

        assert_eq!(
            outcome,
            LiveRefresh::Merged {
                fetched: 2,
                malformed: 0,
                stale: 1,
                added: 1
            }
        );
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.revision(), 1);
    }

    #[tokio::test]
    async fn refresh_twice_does_not_duplicate() {
        let mut catalog = Catalog::new(vec![cataloged(at(2024, 3, 1))]);
        let feed = CannedFeed(vec![record(at(2024, 3, 5), 4.1)]);

        refresh(&mut catalog, &feed, at(2024, 3, 10)).await;
        let second = refresh(&mut catalog, &feed, at(2024, 3, 10)).await;

        assert!(matches!(second, LiveRefresh::Merged { added: 0, .. }));
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn refresh_failure_is_degraded_not_fatal() {
        let mut catalog = Catalog::new(vec![cataloged(at(2024, 3, 1))]);
        let outcome = refresh(&mut catalog, &DownFeed, at(2024, 3, 10)).await;
        assert!(outcome.is_degraded());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.revision(), 0);
    }
}
