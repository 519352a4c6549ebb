#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seismic pattern analysis and forecasting.
//!
//! The pipeline for one region is filter, [`patterns::analyze`], then
//! [`forecast::generate`]. [`recent::summarize`] runs independently on the
//! same filtered events. [`session::ForecastSession`] wires these to a
//! catalog and region registry and memoizes analyses between live
//! refreshes.

pub mod config;
pub mod forecast;
pub mod patterns;
pub mod quality;
pub mod recent;
pub mod session;
pub mod stats;

use thiserror::Error;

/// Errors that can occur while configuring or running a forecast.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The analysis has no significant event to project from.
    #[error("analysis has no reference event to project from")]
    NoReferenceEvent,

    /// The requested region is not in the registry.
    #[error("unknown region '{region_id}'")]
    UnknownRegion {
        /// Region id as requested.
        region_id: String,
    },

    /// The region's bounding box cannot be sampled.
    #[error("invalid region bounds: {message}")]
    InvalidBounds {
        /// Description of what went wrong.
        message: String,
    },

    /// A config value is out of range.
    #[error("invalid forecast config: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error while reading a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
