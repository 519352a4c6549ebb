//! Coarse tectonic zone classification.
//!
//! A pure function of coordinates. The belts overlap geographically, so
//! the predicates are evaluated in a fixed priority order and the first
//! match wins.

use quake_forecast_catalog_models::Zone;

/// Classifies a point into one of the four [`Zone`]s.
#[must_use]
pub fn classify(latitude: f64, longitude: f64) -> Zone {
    if in_pacific_ring(latitude, longitude) {
        Zone::PacificRing
    } else if in_mediterranean_himalayan(latitude, longitude) {
        Zone::MediterraneanHimalayan
    } else if in_atlantic_ridge(latitude, longitude) {
        Zone::AtlanticRidge
    } else {
        Zone::Global
    }
}

fn in_pacific_ring(latitude: f64, longitude: f64) -> bool {
    (-60.0..=70.0).contains(&latitude)
        && ((110.0..=180.0).contains(&longitude) || (-180.0..=-100.0).contains(&longitude))
}

fn in_mediterranean_himalayan(latitude: f64, longitude: f64) -> bool {
    (20.0..=50.0).contains(&latitude) && (-10.0..=160.0).contains(&longitude)
}

fn in_atlantic_ridge(latitude: f64, longitude: f64) -> bool {
    (-40.0..=-10.0).contains(&longitude) && (-60.0..=70.0).contains(&latitude)
}
