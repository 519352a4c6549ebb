//! Forecast session: the catalog, the region registry and a per-region
//! analysis memo.
//!
//! Each request runs filter, analyze and forecast to completion on a
//! private copy of the region's events. The memo is dropped whenever the
//! catalog's revision moves, so a live refresh is always reflected in the
//! next analysis.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quake_forecast_analytics_models::{AnalysisOutcome, RecentActivity, RegionForecast};
use quake_forecast_catalog::Catalog;
use quake_forecast_catalog::filter::filter_region;
use quake_forecast_catalog::live::{self, LiveFeed, LiveRefresh};
use quake_forecast_catalog::registry::RegionRegistry;
use quake_forecast_catalog_models::{Event, Region};
use rand::Rng;

use crate::config::ForecastConfig;
use crate::{ForecastError, forecast, patterns, recent};

struct MemoEntry {
    now: DateTime<Utc>,
    outcome: AnalysisOutcome,
}

/// Owns everything a sequence of forecast requests needs.
pub struct ForecastSession {
    catalog: Catalog,
    registry: RegionRegistry,
    config: ForecastConfig,
    memo: BTreeMap<String, MemoEntry>,
    memo_revision: u64,
}

impl ForecastSession {
    /// Starts a session with an empty analysis memo.
    #[must_use]
    pub fn new(catalog: Catalog, registry: RegionRegistry, config: ForecastConfig) -> Self {
        let memo_revision = catalog.revision();
        Self {
            catalog,
            registry,
            config,
            memo: BTreeMap::new(),
            memo_revision,
        }
    }

    /// The merged event catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Regions this session can analyze.
    #[must_use]
    pub const fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Tuning applied to every forecast.
    #[must_use]
    pub const fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Whole days between the newest cataloged event and `now`.
    #[must_use]
    pub fn data_age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.catalog.latest().map(|latest| (now - latest).num_days())
    }

    /// Looks up a region by id.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::UnknownRegion`] if the registry has no
    /// such region.
    pub fn region(&self, region_id: &str) -> Result<&Region, ForecastError> {
        self.registry
            .get(region_id)
            .ok_or_else(|| ForecastError::UnknownRegion {
                region_id: region_id.to_string(),
            })
    }

    /// Time-ordered copy of the events inside a region.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::UnknownRegion`] for an unknown id.
    pub fn region_events(&self, region_id: &str) -> Result<Vec<Event>, ForecastError> {
        self.region(region_id)?;
        Ok(filter_region(self.catalog.events(), &self.registry, region_id))
    }

    /// Pattern analysis for a region.
    ///
    /// Memoized per region for the exact `now`; a different reference
    /// time recomputes.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::UnknownRegion`] for an unknown id.
    pub fn analyze(
        &mut self,
        region_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AnalysisOutcome, ForecastError> {
        self.invalidate_if_stale();

        let key = self.region(region_id)?.id.clone();

        if let Some(entry) = self.memo.get(&key).filter(|entry| entry.now == now) {
            log::debug!("Using memoized analysis for {key}");
            return Ok(entry.outcome.clone());
        }

        let events = self.region_events(region_id)?;
        log::debug!("Analyzing {} events for {key}", events.len());
        let outcome = patterns::analyze(&events, now);

        self.memo.insert(
            key,
            MemoEntry {
                now,
                outcome: outcome.clone(),
            },
        );
        Ok(outcome)
    }

    /// Trailing-year activity digest for a region.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::UnknownRegion`] for an unknown id.
    pub fn recent_activity(
        &self,
        region_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RecentActivity, ForecastError> {
        let events = self.region_events(region_id)?;
        Ok(recent::summarize(&self.region(region_id)?.id, &events, now))
    }

    /// Runs the full pipeline for a region.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::UnknownRegion`] for an unknown id, or the
    /// forecast generator's errors.
    pub fn forecast<R: Rng + ?Sized>(
        &mut self,
        region_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<RegionForecast, ForecastError> {
        let analysis = match self.analyze(region_id, now)? {
            AnalysisOutcome::Ready(analysis) => analysis,
            AnalysisOutcome::InsufficientData { reason } => {
                log::info!("{region_id}: not enough data to forecast ({reason})");
                return Ok(RegionForecast::InsufficientData { reason });
            }
        };

        let region = self.region(region_id)?;
        let forecast =
            forecast::generate(&analysis, &region.id, &region.bounds, now, &self.config, rng)?;

        Ok(RegionForecast::Ready { analysis, forecast })
    }

    /// Pulls fresh events from `feed` into the catalog.
    ///
    /// Never fails; an unreachable feed leaves the session on historical
    /// data and is reported as [`LiveRefresh::Unavailable`].
    pub async fn refresh_live(&mut self, feed: &dyn LiveFeed, now: DateTime<Utc>) -> LiveRefresh {
        let outcome = live::refresh(&mut self.catalog, feed, now).await;
        self.invalidate_if_stale();
        outcome
    }

    fn invalidate_if_stale(&mut self) {
        if self.catalog.revision() != self.memo_revision {
            log::debug!(
                "Catalog revision {} -> {}, dropping {} memoized analyses",
                self.memo_revision,
                self.catalog.revision(),
                self.memo.len()
            );
            self.memo.clear();
            self.memo_revision = self.catalog.revision();
        }
    }
}
