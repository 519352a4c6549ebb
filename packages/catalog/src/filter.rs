//! Region filter.
//!
//! Restricts a catalog to the events inside a region's inclusive
//! bounding box. Pure; the returned events are owned copies so analysis
//! can never reach back into the catalog.

use quake_forecast_catalog_models::{BoundingBox, Event};

use crate::registry::RegionRegistry;

/// Returns the events inside `bounds`, in ascending time order.
#[must_use]
pub fn filter_bounds(events: &[Event], bounds: &BoundingBox) -> Vec<Event> {
    let mut selected: Vec<Event> = events
        .iter()
        .filter(|e| bounds.contains(e.latitude, e.longitude))
        .cloned()
        .collect();
    selected.sort_by_key(|e| e.occurred_at);
    selected
}

/// Returns the events inside the named region, in ascending time order.
///
/// An unknown region id yields an empty result rather than an error.
#[must_use]
pub fn filter_region(events: &[Event], registry: &RegionRegistry, region_id: &str) -> Vec<Event> {
    registry.get(region_id).map_or_else(
        || {
            log::debug!("Unknown region '{region_id}', nothing to filter");
            Vec::new()
        },
        |region| filter_bounds(events, &region.bounds),
    )
}
