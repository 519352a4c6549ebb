//! Runtime settings from flags and environment variables.

use std::path::PathBuf;
use std::time::Duration;

use quake_forecast_catalog::live::{DEFAULT_FEED_URL, DEFAULT_TIMEOUT};

/// Default location of the historical catalog export.
pub const DEFAULT_CATALOG_PATH: &str = "data/earthquakes.csv";

/// Resolved paths and live feed settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Historical catalog CSV to load.
    pub catalog_path: PathBuf,
    /// USGS-compatible event query endpoint.
    pub feed_url: String,
    /// Per-request timeout for the live feed.
    pub feed_timeout: Duration,
}

impl Settings {
    /// Resolves settings, preferring an explicit `--catalog` flag over
    /// `QUAKE_FORECAST_CATALOG`.
    ///
    /// Also reads `QUAKE_FORECAST_FEED_URL` and
    /// `QUAKE_FORECAST_FEED_TIMEOUT_SECS`; an unparseable timeout falls
    /// back to the default with a warning.
    #[must_use]
    pub fn resolve(catalog_flag: Option<PathBuf>) -> Self {
        Self::from_lookup(catalog_flag, |key| std::env::var(key).ok())
    }

    fn from_lookup(catalog_flag: Option<PathBuf>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let catalog_path = catalog_flag
            .or_else(|| lookup("QUAKE_FORECAST_CATALOG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH));

        let feed_url =
            lookup("QUAKE_FORECAST_FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string());

        let feed_timeout = match lookup("QUAKE_FORECAST_FEED_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_or_else(
                |_| {
                    log::warn!("Ignoring invalid QUAKE_FORECAST_FEED_TIMEOUT_SECS '{raw}'");
                    DEFAULT_TIMEOUT
                },
                Duration::from_secs,
            ),
            None => DEFAULT_TIMEOUT,
        };

        Self {
            catalog_path,
            feed_url,
            feed_timeout,
        }
    }
}
