#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seismic event catalog loading, live feed merging and region filtering.
//!
//! The [`Catalog`] is the deduplicated, time-ordered union of the
//! historical CSV export and any events pulled from a [`live::LiveFeed`].
//! Analysis never mutates it; each request works on a filtered copy
//! produced by [`filter`].

pub mod filter;
pub mod live;
pub mod load;
pub mod parsing;
pub mod registry;
pub mod retry;
pub mod zone;

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use quake_forecast_catalog_models::{Event, EventKey};

/// Errors that make a catalog or registry unusable.
///
/// These are fatal to a session: nothing can be analyzed without a
/// catalog and a region registry.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog file does not exist.
    #[error("catalog not found at {}", path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// I/O error while reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the CSV header.
    #[error("catalog is missing required column '{column}'")]
    MissingColumn {
        /// Canonical column name.
        column: &'static str,
    },

    /// A registry file could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A registry file parsed but contains invalid entries.
    #[error("invalid region registry: {message}")]
    Registry {
        /// Description of what went wrong.
        message: String,
    },
}

/// Errors from the live feed collaborator.
///
/// Never fatal: [`live::refresh`] turns them into
/// [`live::LiveRefresh::Unavailable`].
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with something other than a usable body.
    #[error("feed error: {message}")]
    Response {
        /// Description of what went wrong.
        message: String,
    },
}

/// The in-memory event catalog.
///
/// Events are kept sorted by timestamp and unique by
/// [`Event::key`]. Every change bumps [`Catalog::revision`], which lets
/// callers invalidate anything derived from an older state.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    events: Vec<Event>,
    keys: BTreeSet<EventKey>,
    revision: u64,
}

impl Catalog {
    /// Builds a catalog from arbitrary events, dropping duplicates and
    /// sorting by time.
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        let mut catalog = Self::default();
        catalog.merge(events);
        catalog.revision = 0;
        catalog
    }

    /// All events in ascending timestamp order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the newest event.
    #[must_use]
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|e| e.occurred_at)
    }

    /// Monotonic change counter, starting at 0 for a fresh catalog.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Adds every event whose key is not already present and restores
    /// time order. Returns the number of events actually added.
    ///
    /// Merging the same batch twice is a no-op the second time.
    pub fn merge(&mut self, incoming: Vec<Event>) -> usize {
        let before = self.events.len();

        for event in incoming {
            if self.keys.insert(event.key()) {
                self.events.push(event);
            }
        }

        let added = self.events.len() - before;
        if added > 0 {
            self.events.sort_by_key(|e| e.occurred_at);
            self.revision += 1;
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use quake_forecast_catalog_models::Zone;

    use super::*;

    fn event(day: u32, magnitude: f64) -> Event {
        Event {
            occurred_at: Utc.with_ymd_and_hms(2021, 3, day, 0, 0, 0).unwrap(),
            latitude: 35.0,
            longitude: 139.0,
            depth_km: 10.0,
            magnitude,
            place: None,
            zone: Zone::PacificRing,
        }
    }

    #[test]
    fn new_sorts_and_dedups() {
        let catalog = Catalog::new(vec![event(3, 4.1), event(1, 4.0), event(3, 4.1)]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.revision(), 0);
        assert!(catalog.events()[0].occurred_at < catalog.events()[1].occurred_at);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut catalog = Catalog::new(vec![event(1, 4.0)]);
        let batch = vec![event(2, 4.5), event(5, 5.1)];

        assert_eq!(catalog.merge(batch.clone()), 2);
        assert_eq!(catalog.revision(), 1);

        assert_eq!(catalog.merge(batch), 0);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.revision(), 1);
    }

    #[test]
    fn merge_keeps_time_order() {
        let mut catalog = Catalog::new(vec![event(10, 4.0)]);
        catalog.merge(vec![event(2, 4.2)]);
        let days: Vec<_> = catalog.events().iter().map(|e| e.occurred_at).collect();
        let mut sorted = days.clone();
        sorted.sort();
        assert_eq!(days, sorted);
        assert_eq!(catalog.latest(), Some(event(10, 4.0).occurred_at));
        assert_eq!(catalog.events()[0].occurred_at, event(2, 4.2).occurred_at);
    }
}
