//! Forecast tuning knobs.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```toml
//! snap_tolerance = 0.25
//! min_confidence = 40.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ForecastError;

/// Heuristic constants used by the forecast generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Weight of the median interval in the blended interval.
    pub recent_weight_median: f64,
    /// Weight of the 20-year frequency interval in the blended interval.
    pub recent_weight_frequency: f64,
    /// Seasonal snapping accepts a candidate within this fraction of the
    /// weighted interval.
    pub snap_tolerance: f64,
    /// Minimum whole days between now and a projected estimate before it
    /// is pushed out by one more interval.
    pub near_term_buffer_days: i64,
    /// Upper bound on the uncertainty half-width, as a fraction of the
    /// weighted interval.
    pub max_uncertainty_factor: f64,
    /// Uncertainty fraction used when interval spread is zero.
    pub default_uncertainty_factor: f64,
    /// Lower confidence clamp (percent).
    pub min_confidence: f64,
    /// Upper confidence clamp (percent).
    pub max_confidence: f64,
    /// Recent magnitude trend only shifts the estimate when it differs
    /// from the mean by more than this.
    pub trend_threshold: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            recent_weight_median: 0.6,
            recent_weight_frequency: 0.4,
            snap_tolerance: 0.5,
            near_term_buffer_days: 30,
            max_uncertainty_factor: 0.3,
            default_uncertainty_factor: 0.2,
            min_confidence: 35.0,
            max_confidence: 85.0,
            trend_threshold: 0.15,
        }
    }
}

impl ForecastConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Toml`] on syntax errors or unknown keys and
    /// [`ForecastError::InvalidConfig`] if a value is out of range.
    pub fn from_toml_str(s: &str) -> Result<Self, ForecastError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`Self::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self, ForecastError> {
        log::info!("Loading forecast config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ForecastError> {
        let invalid = |message: &str| {
            Err(ForecastError::InvalidConfig {
                message: message.to_string(),
            })
        };

        let weights = [self.recent_weight_median, self.recent_weight_frequency];
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return invalid("interval weights must be within [0, 1]");
        }
        if (weights[0] + weights[1] - 1.0).abs() > 1e-6 {
            return invalid("interval weights must sum to 1");
        }
        if !(self.snap_tolerance.is_finite() && self.snap_tolerance >= 0.0) {
            return invalid("snap_tolerance must be non-negative");
        }
        if self.near_term_buffer_days < 0 {
            return invalid("near_term_buffer_days must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.max_uncertainty_factor)
            || !(0.0..=1.0).contains(&self.default_uncertainty_factor)
        {
            return invalid("uncertainty factors must be within [0, 1]");
        }
        if !(0.0..=100.0).contains(&self.min_confidence)
            || !(0.0..=100.0).contains(&self.max_confidence)
            || self.min_confidence > self.max_confidence
        {
            return invalid("confidence bounds must satisfy 0 <= min <= max <= 100");
        }
        if !(self.trend_threshold.is_finite() && self.trend_threshold >= 0.0) {
            return invalid("trend_threshold must be non-negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ForecastConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = ForecastConfig::from_toml_str("snap_tolerance = 0.25").unwrap();
        assert!((config.snap_tolerance - 0.25).abs() < f64::EPSILON);
        assert!((config.recent_weight_median - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.near_term_buffer_days, 30);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ForecastConfig::from_toml_str("snap_tolarence = 0.25").unwrap_err();
        assert!(matches!(err, ForecastError::Toml(_)));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let err = ForecastConfig::from_toml_str(
            "recent_weight_median = 0.7\nrecent_weight_frequency = 0.4",
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig { .. }));
    }

    #[test]
    fn inverted_confidence_bounds_are_rejected() {
        let err =
            ForecastConfig::from_toml_str("min_confidence = 90.0\nmax_confidence = 80.0").unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig { .. }));
    }
}
