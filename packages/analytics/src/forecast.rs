//! Forecast generator.
//!
//! Turns a [`PatternAnalysis`] into a single dated, bounded,
//! confidence-scored [`Forecast`]. The date comes from the weighted
//! recurrence interval projected forward from the last significant
//! event; magnitude, coordinates and depth are sampled from the injected
//! random source so callers can seed it.

#![allow(clippy::cast_precision_loss)]

use chrono::{DateTime, Datelike as _, TimeDelta, Utc};
use quake_forecast_analytics_models::{
    ConfidenceFactors, ConfidencePenalties, CertaintyFactors, DateRange, Forecast, IntervalStats,
    PatternAnalysis, PatternStrength, RiskAssessment, RiskLevel,
};
use quake_forecast_catalog_models::BoundingBox;
use rand::Rng;
use rand_distr::{Distribution as _, Normal};

use crate::config::ForecastConfig;
use crate::ForecastError;
use crate::stats::round_to;

const MS_PER_DAY: f64 = 86_400_000.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Floor of any predicted magnitude.
const MIN_PREDICTED_MAGNITUDE: f64 = 4.0;
/// Ceiling of any predicted magnitude.
const MAX_PREDICTED_MAGNITUDE: f64 = 9.5;
/// How far above the largest recorded magnitude a prediction may go.
const MAGNITUDE_HEADROOM: f64 = 0.5;

/// Where the future projection left the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    /// Projected estimate.
    pub estimate: DateTime<Utc>,
    /// Whole weighted intervals added to move past `now`.
    pub cycles: i64,
    /// Whether the near-term buffer replaced the projected date.
    pub buffered: bool,
}

/// Generates a forecast for `region_id` from `analysis`.
///
/// # Errors
///
/// * [`ForecastError::NoReferenceEvent`] if the analysis has no last
///   significant event to project from.
/// * [`ForecastError::InvalidBounds`] if `bounds` is not a valid box.
pub fn generate<R: Rng + ?Sized>(
    analysis: &PatternAnalysis,
    region_id: &str,
    bounds: &BoundingBox,
    now: DateTime<Utc>,
    config: &ForecastConfig,
    rng: &mut R,
) -> Result<Forecast, ForecastError> {
    let last = analysis
        .last_significant
        .ok_or(ForecastError::NoReferenceEvent)?;
    bounds.validate().map_err(|e| ForecastError::InvalidBounds {
        message: e.to_string(),
    })?;

    let weighted = weighted_interval(analysis, config);
    let projection = project_forward(last + days(weighted), weighted, now, config);
    if projection.cycles > 0 {
        log::debug!(
            "{region_id}: estimate was overdue, advanced {} cycles{}",
            projection.cycles,
            if projection.buffered { " plus buffer" } else { "" }
        );
    }

    let snapped = snap_to_peak_month(
        projection.estimate,
        &analysis.seasonality.peak_months,
        weighted,
        now,
        config,
    );
    let (predicted_date, date_range) =
        uncertainty_window(snapped, weighted, &analysis.intervals, now, config);

    let days_since_last = (now - last).num_days();
    let (confidence, confidence_factors, confidence_penalties) =
        confidence(analysis, days_since_last, config);

    let predicted_magnitude = predict_magnitude(analysis, config, rng);
    let (estimated_latitude, estimated_longitude) = sample_location(bounds, rng);
    let estimated_depth_km = sample_depth(analysis, rng);

    let consistency = &analysis.consistency;
    let certainty = CertaintyFactors {
        data_points: analysis.significant_events,
        major_events: analysis.major_events,
        data_quality_score: analysis.data_quality.score,
        pattern_consistency: round_to(consistency.temporal, 2),
        magnitude_consistency: round_to(consistency.magnitude, 2),
        depth_consistency: round_to(consistency.depth, 2),
        seasonal_consistency: round_to(consistency.seasonal, 2),
        recent_activity_20yr: analysis.frequency.per_year_20yr,
        recent_activity_5yr: analysis.frequency.per_year_5yr,
    };

    Ok(Forecast {
        region_id: region_id.to_string(),
        generated_at: now,
        predicted_date,
        date_range,
        predicted_magnitude,
        estimated_depth_km,
        estimated_latitude,
        estimated_longitude,
        confidence,
        confidence_factors,
        confidence_penalties,
        risk: RiskAssessment::from(RiskLevel::from_magnitude(predicted_magnitude)),
        peak_months: analysis.seasonality.peak_months.clone(),
        peak_season: analysis.seasonality.peak_season,
        days_since_last,
        expected_interval_years: round_to(weighted / DAYS_PER_YEAR, 1),
        pattern_strength: PatternStrength::from_temporal_consistency(consistency.temporal),
        certainty,
    })
}

/// Fractional days as a duration (millisecond resolution).
#[allow(clippy::cast_possible_truncation)]
fn days(value: f64) -> TimeDelta {
    TimeDelta::milliseconds((value * MS_PER_DAY).round() as i64)
}

/// Blend of the median interval and the interval implied by the 20-year
/// frequency; just the median when there were no events in that window.
#[must_use]
pub fn weighted_interval(analysis: &PatternAnalysis, config: &ForecastConfig) -> f64 {
    let median = analysis.intervals.median_days;
    let per_year = analysis.frequency.per_year_20yr;
    if per_year > 0.0 {
        config
            .recent_weight_median
            .mul_add(median, config.recent_weight_frequency * DAYS_PER_YEAR / per_year)
    } else {
        median
    }
}

/// Moves an estimate that is not after `now` forward by whole intervals.
///
/// If the projected date still falls within the near-term buffer it is
/// replaced by `now + buffer + weighted`. Estimates already in the future
/// are returned unchanged.
#[must_use]
pub fn project_forward(
    estimate: DateTime<Utc>,
    weighted: f64,
    now: DateTime<Utc>,
    config: &ForecastConfig,
) -> Projection {
    if estimate > now {
        return Projection {
            estimate,
            cycles: 0,
            buffered: false,
        };
    }

    let overdue_days = (now - estimate).num_days() as f64;
    #[allow(clippy::cast_possible_truncation)]
    let cycles = (overdue_days / weighted).floor() as i64 + 1;
    let mut projected = estimate + days(weighted * cycles as f64);

    let buffered = (projected - now).num_days() < config.near_term_buffer_days;
    if buffered {
        projected = now + days(config.near_term_buffer_days as f64 + weighted);
    }

    Projection {
        estimate: projected,
        cycles,
        buffered,
    }
}

/// Moves the estimate onto the 15th of the first peak month when such a
/// date (this year or next) is in the future and close enough.
#[must_use]
pub fn snap_to_peak_month(
    estimate: DateTime<Utc>,
    peak_months: &[u32],
    weighted: f64,
    now: DateTime<Utc>,
    config: &ForecastConfig,
) -> DateTime<Utc> {
    let Some(&target) = peak_months.first() else {
        return estimate;
    };
    if peak_months.contains(&estimate.month()) {
        return estimate;
    }

    let tolerance = weighted * config.snap_tolerance;
    let candidate = |year: i32| {
        now.with_day(15)
            .and_then(|d| d.with_month(target))
            .and_then(|d| d.with_year(year))
    };
    let acceptable = |c: DateTime<Utc>| c > now && ((c - estimate).num_days().abs() as f64) < tolerance;

    [now.year(), now.year() + 1]
        .into_iter()
        .filter_map(candidate)
        .find(|&c| acceptable(c))
        .unwrap_or(estimate)
}

/// Builds the date window around `estimate` and shifts everything
/// forward if the lower bound is not after `now`.
#[must_use]
pub fn uncertainty_window(
    estimate: DateTime<Utc>,
    weighted: f64,
    intervals: &IntervalStats,
    now: DateTime<Utc>,
    config: &ForecastConfig,
) -> (DateTime<Utc>, DateRange) {
    let factor = intervals
        .coefficient_of_variation()
        .map_or(config.default_uncertainty_factor, |cov| {
            cov.min(config.max_uncertainty_factor)
        });
    let half_width = days(weighted * factor);

    let mut estimate = estimate;
    let mut start = estimate - half_width;
    let mut end = estimate + half_width;

    if start <= now {
        let shift = TimeDelta::days((now - start).num_days() + 1);
        start += shift;
        end += shift;
        estimate += shift;
    }

    (estimate, DateRange { start, end })
}

/// Scores confidence from the analysis and clamps it to the configured
/// range.
#[must_use]
pub fn confidence(
    analysis: &PatternAnalysis,
    days_since_last: i64,
    config: &ForecastConfig,
) -> (u8, ConfidenceFactors, ConfidencePenalties) {
    let n = analysis.significant_events;
    let cov = analysis.intervals.coefficient_of_variation();

    let pattern_regularity = match cov {
        None => 15,
        Some(c) if c < 0.2 => 25,
        Some(c) if c < 0.4 => 20,
        Some(c) if c < 0.6 => 15,
        Some(_) => 10,
    };

    let data_recency = match days_since_last {
        d if d < 365 => 20,
        d if d < 1825 => 15,
        d if d < 3650 => 10,
        _ => 5,
    };

    let monthly = &analysis.seasonality.monthly;
    let seasonal_pattern = if !analysis.seasonality.peak_months.is_empty() && monthly.len() > 6 {
        let max = monthly.values().copied().max().unwrap_or(0) as f64;
        let avg = monthly.values().sum::<usize>() as f64 / monthly.len() as f64;
        if max > avg * 1.5 {
            15
        } else if max > avg * 1.2 {
            10
        } else {
            5
        }
    } else {
        5
    };

    let depth = &analysis.depth;
    let depth_total = depth.shallow_count + depth.deep_count;
    let geographic_consistency = if depth_total > 0 {
        let ratio = depth.shallow_count.max(depth.deep_count) as f64 / depth_total as f64;
        if ratio > 0.8 {
            15
        } else if ratio > 0.6 {
            12
        } else {
            8
        }
    } else {
        8
    };

    let factors = ConfidenceFactors {
        data_volume: (n as f64 / 50.0 * 25.0).min(25.0),
        pattern_regularity,
        data_recency,
        seasonal_pattern,
        geographic_consistency,
    };

    let penalties = ConfidencePenalties {
        sparse_data: match n {
            n if n < 10 => -15,
            n if n < 20 => -10,
            _ => 0,
        },
        high_variability: if cov.is_some_and(|c| c > 1.0) { -10 } else { 0 },
        outdated_data: match days_since_last {
            d if d > 7300 => -15,
            d if d > 3650 => -8,
            _ => 0,
        },
    };

    let score = (factors.total() + penalties.total())
        .clamp(config.min_confidence, config.max_confidence)
        .round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = score as u8;

    (score, factors, penalties)
}

/// Samples a magnitude around the (trend-adjusted) mean.
fn predict_magnitude<R: Rng + ?Sized>(
    analysis: &PatternAnalysis,
    config: &ForecastConfig,
    rng: &mut R,
) -> f64 {
    let stats = &analysis.magnitude;
    let trend_weight = if analysis.frequency.per_year_5yr > analysis.frequency.per_year_20yr {
        0.3
    } else {
        0.2
    };
    let base = if (stats.trend - stats.mean).abs() > config.trend_threshold {
        stats.mean.mul_add(1.0 - trend_weight, stats.trend * trend_weight)
    } else {
        stats.mean
    };

    let sigma = if stats.std < 0.3 {
        0.2
    } else if stats.std < 0.6 {
        0.35
    } else {
        0.5
    };
    let noise = Normal::new(0.0, sigma).map_or(0.0, |normal| normal.sample(rng));

    let lo = MIN_PREDICTED_MAGNITUDE.max(stats.min);
    let hi = (stats.max + MAGNITUDE_HEADROOM).min(MAX_PREDICTED_MAGNITUDE).max(lo);
    round_within(base + noise, lo, hi)
}

/// Clamps to `[lo, hi]` and rounds to one decimal without leaving the
/// range.
fn round_within(value: f64, lo: f64, hi: f64) -> f64 {
    let clamped = value.clamp(lo, hi);
    let rounded = round_to(clamped, 1);
    if rounded < lo {
        let up = (lo.mul_add(10.0, -1e-9)).ceil() / 10.0;
        return if up <= hi { up } else { clamped };
    }
    if rounded > hi {
        let down = (hi.mul_add(10.0, 1e-9)).floor() / 10.0;
        return if down >= lo { down } else { clamped };
    }
    rounded
}

fn sample_location<R: Rng + ?Sized>(bounds: &BoundingBox, rng: &mut R) -> (f64, f64) {
    let lat = rng.random_range(bounds.lat_min..=bounds.lat_max);
    let lon = rng.random_range(bounds.lon_min..=bounds.lon_max);
    (
        round_to(lat, 2).clamp(bounds.lat_min, bounds.lat_max),
        round_to(lon, 2).clamp(bounds.lon_min, bounds.lon_max),
    )
}

fn sample_depth<R: Rng + ?Sized>(analysis: &PatternAnalysis, rng: &mut R) -> f64 {
    let depth = if analysis.depth.shallow_count > analysis.depth.deep_count {
        rng.random_range(5.0..=70.0)
    } else {
        rng.random_range(70.0..=200.0)
    };
    round_to(depth, 1)
}
