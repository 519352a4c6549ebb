#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pattern analysis, forecast and recent-activity record types.
//!
//! These are the plain records the analytics pipeline hands to
//! presentation layers. Nothing here is persisted; every record is
//! recomputed from a region's events on request.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quake_forecast_catalog_models::Event;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Meteorological season (northern-hemisphere month grouping).
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Season {
    /// December, January, February.
    Winter,
    /// March, April, May.
    Spring,
    /// June, July, August.
    Summer,
    /// September, October, November.
    Autumn,
}

impl Season {
    /// All seasons in tie-break order.
    pub const ALL: [Self; 4] = [Self::Winter, Self::Spring, Self::Summer, Self::Autumn];

    /// Season containing calendar month `month` (1-12).
    #[must_use]
    pub const fn of_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    /// Calendar months belonging to this season.
    #[must_use]
    pub const fn months(self) -> [u32; 3] {
        match self {
            Self::Winter => [12, 1, 2],
            Self::Spring => [3, 4, 5],
            Self::Summer => [6, 7, 8],
            Self::Autumn => [9, 10, 11],
        }
    }
}

/// Forecast risk classification, derived from predicted magnitude.
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
#[strum(serialize_all = "title_case")]
pub enum RiskLevel {
    /// Below M4.5.
    Low,
    /// M4.5 to below M5.5.
    Moderate,
    /// M5.5 to below M6.5.
    High,
    /// M6.5 to below M7.5.
    VeryHigh,
    /// M7.5 and above.
    Extreme,
}

impl RiskLevel {
    /// Classifies a magnitude.
    #[must_use]
    pub fn from_magnitude(magnitude: f64) -> Self {
        if magnitude < 4.5 {
            Self::Low
        } else if magnitude < 5.5 {
            Self::Moderate
        } else if magnitude < 6.5 {
            Self::High
        } else if magnitude < 7.5 {
            Self::VeryHigh
        } else {
            Self::Extreme
        }
    }

    /// Expected shaking and damage at this level.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Low => "Light shaking, minimal damage",
            Self::Moderate => "Moderate shaking, some damage",
            Self::High => "Strong shaking, considerable damage",
            Self::VeryHigh => "Severe shaking, major damage",
            Self::Extreme => "Violent shaking, catastrophic damage",
        }
    }
}

/// Qualitative label for how regular a region's event spacing is.
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
pub enum PatternStrength {
    /// Temporal consistency above 0.7.
    Strong,
    /// Temporal consistency above 0.4.
    Moderate,
    /// Everything else.
    Weak,
}

impl PatternStrength {
    /// Labels a temporal consistency value.
    #[must_use]
    pub fn from_temporal_consistency(consistency: f64) -> Self {
        if consistency > 0.7 {
            Self::Strong
        } else if consistency > 0.4 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

/// Outlier-filtered spacing between consecutive significant events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalStats {
    /// Mean of the surviving intervals, in days.
    pub mean_days: f64,
    /// Median of the surviving intervals, in days.
    pub median_days: f64,
    /// Sample standard deviation of the surviving intervals, in days.
    pub std_days: f64,
    /// Number of intervals before outlier filtering.
    pub raw_count: usize,
    /// Surviving intervals in whole days, in event order.
    pub intervals: Vec<i64>,
}

impl IntervalStats {
    /// Mean interval expressed in years.
    #[must_use]
    pub fn mean_years(&self) -> f64 {
        self.mean_days / 365.25
    }

    /// Standard deviation over mean, or `None` when the spread is zero.
    #[must_use]
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        (self.std_days > 0.0 && self.mean_days > 0.0).then(|| self.std_days / self.mean_days)
    }
}

/// Significant-event counts per season.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonCounts {
    /// Dec/Jan/Feb.
    pub winter: usize,
    /// Mar/Apr/May.
    pub spring: usize,
    /// Jun/Jul/Aug.
    pub summer: usize,
    /// Sep/Oct/Nov.
    pub autumn: usize,
}

impl SeasonCounts {
    /// Count for one season.
    #[must_use]
    pub const fn get(&self, season: Season) -> usize {
        match season {
            Season::Winter => self.winter,
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Autumn => self.autumn,
        }
    }

    /// Sum over all seasons.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.winter + self.spring + self.summer + self.autumn
    }
}

/// Monthly and seasonal distribution of significant events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalPattern {
    /// Count per calendar month; only months with at least one event.
    pub monthly: BTreeMap<u32, usize>,
    /// Counts summed per season.
    pub seasons: SeasonCounts,
    /// Months with elevated activity in calendar order, or the three
    /// busiest months (busiest first) when none clear the threshold.
    pub peak_months: Vec<u32>,
    /// Season with the most events.
    pub peak_season: Season,
    /// Share of events falling in the peak season.
    pub confidence: f64,
}

/// Magnitude distribution of significant events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnitudeStats {
    /// Mean magnitude.
    pub mean: f64,
    /// Largest magnitude.
    pub max: f64,
    /// Smallest magnitude.
    pub min: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Mean of per-year means over the last decade, or `mean` if the
    /// decade covers fewer than three distinct years.
    pub trend: f64,
}

/// Depth distribution of significant events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthStats {
    /// Mean depth in kilometers.
    pub mean_km: f64,
    /// Sample standard deviation in kilometers.
    pub std_km: f64,
    /// Events shallower than 70 km.
    pub shallow_count: usize,
    /// Events at 70 km or deeper.
    pub deep_count: usize,
}

/// Significant events per year over trailing calendar-year windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyStats {
    /// Events per year over the last 5 calendar years.
    pub per_year_5yr: f64,
    /// Events per year over the last 20 calendar years.
    pub per_year_20yr: f64,
}

/// Composite data-quality score and its four 0-25 components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    /// Time span covered by significant events.
    pub span: u8,
    /// Number of significant events.
    pub volume: u8,
    /// Age of the newest significant event.
    pub recency: u8,
    /// Spread between smallest and largest magnitude.
    pub magnitude_range: u8,
    /// Sum of the components, capped at 100.
    pub score: u8,
}

/// Four 0-1 regularity measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyMetrics {
    /// Regularity of event spacing.
    pub temporal: f64,
    /// Regularity of magnitudes.
    pub magnitude: f64,
    /// Dominance of either the shallow or the deep class.
    pub depth: f64,
    /// Dominance of the peak season.
    pub seasonal: f64,
}

/// Statistical snapshot of one region's event history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysis {
    /// All events in the region.
    pub total_events: usize,
    /// Events at or above the significant threshold.
    pub significant_events: usize,
    /// Events at or above the major threshold.
    pub major_events: usize,
    pub intervals: IntervalStats,
    pub seasonality: SeasonalPattern,
    pub magnitude: MagnitudeStats,
    pub depth: DepthStats,
    pub frequency: FrequencyStats,
    /// Timestamp of the newest significant event.
    pub last_significant: Option<DateTime<Utc>>,
    pub data_quality: DataQuality,
    pub consistency: ConsistencyMetrics,
}

/// Which minimum-sample gate an analysis failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsufficientReason {
    /// Not enough events in the region.
    TooFewEvents {
        /// Events available.
        found: usize,
        /// Events needed.
        required: usize,
    },
    /// Not enough significant events.
    TooFewSignificant {
        /// Significant events available.
        found: usize,
        /// Significant events needed.
        required: usize,
    },
    /// Too few intervals survived outlier filtering.
    TooFewIntervals {
        /// Intervals that survived.
        found: usize,
        /// Intervals needed.
        required: usize,
    },
}

impl std::fmt::Display for InsufficientReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewEvents { found, required } => {
                write!(f, "only {found} events in region (need {required})")
            }
            Self::TooFewSignificant { found, required } => {
                write!(f, "only {found} events of M4.0+ (need {required})")
            }
            Self::TooFewIntervals { found, required } => {
                write!(f, "only {found} usable recurrence intervals (need {required})")
            }
        }
    }
}

/// Result of running the pattern analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Enough data; the analysis is complete.
    Ready(PatternAnalysis),
    /// A minimum-sample gate failed.
    InsufficientData {
        /// The gate that failed.
        reason: InsufficientReason,
    },
}

impl AnalysisOutcome {
    /// The analysis, if one was produced.
    #[must_use]
    pub const fn analysis(&self) -> Option<&PatternAnalysis> {
        match self {
            Self::Ready(analysis) => Some(analysis),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// Inclusive predicted date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Earliest expected date.
    pub start: DateTime<Utc>,
    /// Latest expected date.
    pub end: DateTime<Utc>,
}

/// Positive contributions to forecast confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceFactors {
    /// 0-25, proportional to significant event count.
    pub data_volume: f64,
    /// 10-25, from the interval coefficient of variation.
    pub pattern_regularity: u8,
    /// 5-20, from the age of the last significant event.
    pub data_recency: u8,
    /// 5-15, from monthly concentration.
    pub seasonal_pattern: u8,
    /// 8-15, from shallow/deep dominance.
    pub geographic_consistency: u8,
}

impl ConfidenceFactors {
    /// Sum of all factors.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.data_volume
            + f64::from(self.pattern_regularity)
            + f64::from(self.data_recency)
            + f64::from(self.seasonal_pattern)
            + f64::from(self.geographic_consistency)
    }
}

/// Deductions from forecast confidence (zero or negative).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidencePenalties {
    pub sparse_data: i8,
    pub high_variability: i8,
    pub outdated_data: i8,
}

impl ConfidencePenalties {
    /// Sum of all penalties.
    #[must_use]
    pub fn total(&self) -> f64 {
        f64::from(self.sparse_data) + f64::from(self.high_variability) + f64::from(self.outdated_data)
    }
}

/// Risk level with its human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub description: String,
}

impl From<RiskLevel> for RiskAssessment {
    fn from(level: RiskLevel) -> Self {
        Self {
            level,
            description: level.description().to_string(),
        }
    }
}

/// Inputs to the forecast, summarized for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertaintyFactors {
    /// Significant events analyzed.
    pub data_points: usize,
    /// Major events in the region.
    pub major_events: usize,
    pub data_quality_score: u8,
    /// Consistency metrics, rounded to two decimals.
    pub pattern_consistency: f64,
    pub magnitude_consistency: f64,
    pub depth_consistency: f64,
    pub seasonal_consistency: f64,
    /// Significant events per year, last 20 calendar years.
    pub recent_activity_20yr: f64,
    /// Significant events per year, last 5 calendar years.
    pub recent_activity_5yr: f64,
}

/// A single dated, bounded prediction for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub region_id: String,
    /// The "now" the forecast was computed against.
    pub generated_at: DateTime<Utc>,
    pub predicted_date: DateTime<Utc>,
    pub date_range: DateRange,
    /// Magnitude rounded to one decimal.
    pub predicted_magnitude: f64,
    /// Depth in kilometers, rounded to one decimal.
    pub estimated_depth_km: f64,
    /// Latitude rounded to two decimals.
    pub estimated_latitude: f64,
    /// Longitude rounded to two decimals.
    pub estimated_longitude: f64,
    /// Confidence percentage, 35-85.
    pub confidence: u8,
    pub confidence_factors: ConfidenceFactors,
    pub confidence_penalties: ConfidencePenalties,
    pub risk: RiskAssessment,
    pub peak_months: Vec<u32>,
    pub peak_season: Season,
    /// Whole days between the last significant event and `generated_at`.
    pub days_since_last: i64,
    /// Weighted interval in years, rounded to one decimal.
    pub expected_interval_years: f64,
    pub pattern_strength: PatternStrength,
    pub certainty: CertaintyFactors,
}

/// Analysis plus forecast for one region, or the gate that stopped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegionForecast {
    /// The region was analyzable and a forecast was generated.
    Ready {
        analysis: PatternAnalysis,
        forecast: Forecast,
    },
    /// A minimum-sample gate failed; no forecast was attempted.
    InsufficientData {
        /// The gate that failed.
        reason: InsufficientReason,
    },
}

/// Where the reported latest significant event was found.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SignificantSource {
    /// Within the trailing 365-day window.
    Window,
    /// Outside the window, from the full region history.
    History,
}

/// Trailing-year activity digest for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivitySummary {
    pub region_id: String,
    /// Start of the trailing window (inclusive).
    pub window_start: DateTime<Utc>,
    /// M3.0+ events in the window.
    pub total_recent: usize,
    /// M4.0+ events in the window.
    pub significant_recent: usize,
    /// Newest M3.0+ event in the window.
    pub latest: Option<Event>,
    pub days_since_latest: Option<i64>,
    /// Newest M4.0+ event, from the window or else the full history.
    pub latest_significant: Option<Event>,
    pub days_since_significant: Option<i64>,
    pub significant_source: Option<SignificantSource>,
}

/// Result of the recent-activity summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecentActivity {
    /// The region has no events at all.
    NoRegionData,
    /// The region has events; counts may still be zero.
    Summary(RecentActivitySummary),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_month_has_exactly_one_season() {
        for month in 1..=12 {
            let owners: Vec<_> = Season::ALL
                .iter()
                .filter(|s| s.months().contains(&month))
                .collect();
            assert_eq!(owners, vec![&Season::of_month(month)]);
        }
    }

    #[test]
    fn risk_thresholds() {
        assert_eq!(RiskLevel::from_magnitude(4.4), RiskLevel::Low);
        assert_eq!(RiskLevel::from_magnitude(4.5), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_magnitude(6.4), RiskLevel::High);
        assert_eq!(RiskLevel::from_magnitude(7.0), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_magnitude(7.5), RiskLevel::Extreme);
        assert_eq!(RiskLevel::VeryHigh.to_string(), "Very High");
        assert_eq!(
            RiskLevel::Extreme.description(),
            "Violent shaking, catastrophic damage"
        );
    }

    #[test]
    fn pattern_strength_thresholds() {
        assert_eq!(PatternStrength::from_temporal_consistency(0.8), PatternStrength::Strong);
        assert_eq!(PatternStrength::from_temporal_consistency(0.7), PatternStrength::Moderate);
        assert_eq!(PatternStrength::from_temporal_consistency(0.4), PatternStrength::Weak);
    }

    #[test]
    fn zero_spread_has_no_coefficient_of_variation() {
        let stats = IntervalStats {
            mean_days: 365.0,
            median_days: 365.0,
            std_days: 0.0,
            raw_count: 11,
            intervals: vec![365; 11],
        };
        assert!(stats.coefficient_of_variation().is_none());
        assert!((stats.mean_years() - 365.0 / 365.25).abs() < 1e-12);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = AnalysisOutcome::InsufficientData {
            reason: InsufficientReason::TooFewSignificant {
                found: 3,
                required: 5,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["reason"]["kind"], "too_few_significant");
        assert!(outcome.analysis().is_none());
    }
}
