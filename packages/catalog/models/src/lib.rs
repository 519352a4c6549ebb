#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seismic event, tectonic zone and region types.
//!
//! This crate defines the canonical [`Event`] shape shared by the catalog
//! loader, the live feed normalizer and the analytics pipeline, together
//! with the static [`Region`] configuration that analysis is scoped to.

use chrono::{DateTime, Datelike as _, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Magnitude at or above which an event is considered "significant"
/// (generally felt). Pattern analysis runs on this subset.
pub const SIGNIFICANT_MAGNITUDE: f64 = 4.0;

/// Magnitude at or above which an event is considered "major". Only used
/// as a secondary count.
pub const MAJOR_MAGNITUDE: f64 = 5.0;

/// Lowest magnitude counted by the recent-activity digest. Matches the
/// lower cutoff requested from the live feed.
pub const FELT_MAGNITUDE: f64 = 3.0;

/// Coarse tectonic zone an event is tagged with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Zone {
    /// Circum-Pacific subduction belt.
    PacificRing,
    /// Alpide belt from the Mediterranean through the Himalaya.
    MediterraneanHimalayan,
    /// Mid-Atlantic spreading ridge.
    AtlanticRidge,
    /// Everything else.
    Global,
}

impl Zone {
    /// Parses a zone label as it appears in catalog files.
    ///
    /// Accepts both the bare form (`"pacific_ring"`) and the suffixed form
    /// used by older exports (`"pacific_ring_zone"`). Case-insensitive.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        let bare = label.strip_suffix("_zone").unwrap_or(&label);
        bare.parse().ok()
    }
}

/// A single seismic event.
///
/// Events are immutable once ingested; the catalog only ever adds or
/// discards whole records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Hypocenter depth in kilometers.
    pub depth_km: f64,
    /// Reported magnitude.
    pub magnitude: f64,
    /// Free-text place description (e.g. "12 km SSW of Tokyo").
    pub place: Option<String>,
    /// Tectonic zone tag.
    pub zone: Zone,
}

impl Event {
    /// Calendar year of the event (UTC).
    #[must_use]
    pub fn year(&self) -> i32 {
        self.occurred_at.year()
    }

    /// Calendar month of the event, 1-12 (UTC).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.occurred_at.month()
    }

    /// Whether the magnitude reaches [`SIGNIFICANT_MAGNITUDE`].
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.magnitude >= SIGNIFICANT_MAGNITUDE
    }

    /// Whether the magnitude reaches [`MAJOR_MAGNITUDE`].
    #[must_use]
    pub fn is_major(&self) -> bool {
        self.magnitude >= MAJOR_MAGNITUDE
    }

    /// Identity used to deduplicate records across ingestion sources.
    #[must_use]
    pub fn key(&self) -> EventKey {
        EventKey {
            timestamp_micros: self.occurred_at.timestamp_micros(),
            latitude_bits: self.latitude.to_bits(),
            longitude_bits: self.longitude.to_bits(),
            magnitude_bits: self.magnitude.to_bits(),
        }
    }
}

/// Deduplication key: (timestamp, latitude, longitude, magnitude).
///
/// Floats are compared by bit pattern so that the key is `Eq + Ord + Hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    timestamp_micros: i64,
    latitude_bits: u64,
    longitude_bits: u64,
    magnitude_bits: u64,
}

/// An inclusive latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub lat_min: f64,
    /// Northern edge.
    pub lat_max: f64,
    /// Western edge.
    pub lon_min: f64,
    /// Eastern edge.
    pub lon_max: f64,
}

impl BoundingBox {
    /// Creates a bounding box from latitude and longitude ranges.
    #[must_use]
    pub const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Returns `true` if the point lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&latitude)
            && (self.lon_min..=self.lon_max).contains(&longitude)
    }

    /// Checks that the ranges are ordered and within WGS84 limits.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBoundingBoxError`] describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<(), InvalidBoundingBoxError> {
        let ranges_ok = self.lat_min <= self.lat_max && self.lon_min <= self.lon_max;
        let lat_ok = (-90.0..=90.0).contains(&self.lat_min) && (-90.0..=90.0).contains(&self.lat_max);
        let lon_ok =
            (-180.0..=180.0).contains(&self.lon_min) && (-180.0..=180.0).contains(&self.lon_max);

        if !ranges_ok {
            return Err(InvalidBoundingBoxError {
                reason: "minimum exceeds maximum",
            });
        }
        if !lat_ok {
            return Err(InvalidBoundingBoxError {
                reason: "latitude outside [-90, 90]",
            });
        }
        if !lon_ok {
            return Err(InvalidBoundingBoxError {
                reason: "longitude outside [-180, 180]",
            });
        }
        Ok(())
    }
}

/// Error returned by [`BoundingBox::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidBoundingBoxError {
    /// Which constraint failed.
    pub reason: &'static str,
}

impl std::fmt::Display for InvalidBoundingBoxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid bounding box: {}", self.reason)
    }
}

impl std::error::Error for InvalidBoundingBoxError {}

/// A named region analysis can be scoped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Registry key (e.g. `"USA-California"`).
    pub id: String,
    /// Human-readable name (e.g. `"California, USA"`).
    pub name: String,
    /// Inclusive coordinate box.
    pub bounds: BoundingBox,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn event_at(latitude: f64, longitude: f64, magnitude: f64) -> Event {
        Event {
            occurred_at: Utc.with_ymd_and_hms(2020, 6, 15, 12, 0, 0).unwrap(),
            latitude,
            longitude,
            depth_km: 10.0,
            magnitude,
            place: None,
            zone: Zone::Global,
        }
    }

    #[test]
    fn zone_labels_parse_with_and_without_suffix() {
        assert_eq!(Zone::from_label("pacific_ring"), Some(Zone::PacificRing));
        assert_eq!(
            Zone::from_label("mediterranean_himalayan_zone"),
            Some(Zone::MediterraneanHimalayan)
        );
        assert_eq!(Zone::from_label(" Global_Zone "), Some(Zone::Global));
        assert_eq!(Zone::from_label("arctic"), None);
    }

    #[test]
    fn zone_display_roundtrip() {
        for zone in [
            Zone::PacificRing,
            Zone::MediterraneanHimalayan,
            Zone::AtlanticRidge,
            Zone::Global,
        ] {
            assert_eq!(Zone::from_label(zone.as_ref()), Some(zone));
        }
    }

    #[test]
    fn bounding_box_edges_are_inclusive() {
        let bounds = BoundingBox::new(8.0, 37.0, 68.0, 97.0);
        assert!(bounds.contains(8.0, 68.0));
        assert!(bounds.contains(37.0, 97.0));
        assert!(!bounds.contains(7.999, 80.0));
        assert!(!bounds.contains(20.0, 97.001));
    }

    #[test]
    fn bounding_box_validation() {
        assert!(BoundingBox::new(8.0, 37.0, 68.0, 97.0).validate().is_ok());
        assert!(BoundingBox::new(37.0, 8.0, 68.0, 97.0).validate().is_err());
        assert!(BoundingBox::new(-95.0, 8.0, 68.0, 97.0).validate().is_err());
        assert!(BoundingBox::new(8.0, 37.0, 68.0, 181.0).validate().is_err());
    }

    #[test]
    fn magnitude_classes() {
        let minor = event_at(0.0, 0.0, 3.9);
        let significant = event_at(0.0, 0.0, 4.0);
        let major = event_at(0.0, 0.0, 5.0);
        assert!(!minor.is_significant());
        assert!(significant.is_significant() && !significant.is_major());
        assert!(major.is_significant() && major.is_major());
    }

    #[test]
    fn key_distinguishes_magnitude() {
        let a = event_at(35.0, 139.0, 4.5);
        let b = event_at(35.0, 139.0, 4.6);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
    }

    #[test]
    fn event_serializes_camel_case() {
        let json = serde_json::to_value(event_at(35.0, 139.0, 4.5)).unwrap();
        assert!(json.get("occurredAt").is_some());
        assert_eq!(json["zone"], "global");
    }
}
