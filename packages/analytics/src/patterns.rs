//! Pattern analyzer.
//!
//! Turns one region's events into a [`PatternAnalysis`]: recurrence
//! intervals, monthly and seasonal distribution, magnitude and depth
//! statistics, recent frequencies, a data-quality score and four
//! consistency metrics. Analysis runs on the significant (M4.0+) subset.
//!
//! The analyzer is a pure function of the event *set* and `now`; input
//! order does not matter.

#![allow(clippy::cast_precision_loss)]

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Datelike as _, Utc};
use quake_forecast_analytics_models::{
    AnalysisOutcome, ConsistencyMetrics, DepthStats, FrequencyStats, InsufficientReason,
    IntervalStats, MagnitudeStats, PatternAnalysis, Season, SeasonCounts, SeasonalPattern,
};
use quake_forecast_catalog_models::Event;

use crate::{quality, stats};

/// Minimum events a region needs before it is analyzed at all.
pub const MIN_REGION_EVENTS: usize = 10;

/// Minimum significant events required.
pub const MIN_SIGNIFICANT_EVENTS: usize = 5;

/// Minimum intervals that must survive outlier filtering.
pub const MIN_INTERVALS: usize = 3;

/// Depth separating shallow from deep events, in kilometers.
pub const SHALLOW_DEPTH_KM: f64 = 70.0;

/// Shortest recurrence interval considered, in days.
const MIN_INTERVAL_DAYS: f64 = 30.0;
/// Longest interval kept by the IQR filter (20 years).
const MAX_IQR_INTERVAL_DAYS: f64 = 7300.0;
/// Longest interval kept by the fixed fallback filter (10 years).
const MAX_FIXED_INTERVAL_DAYS: f64 = 3650.0;

/// Consistency reported when the underlying spread is exactly zero.
const ZERO_SPREAD_CONSISTENCY: f64 = 0.8;

/// Analyzes one region's events as of `now`.
#[must_use]
pub fn analyze(events: &[Event], now: DateTime<Utc>) -> AnalysisOutcome {
    let mut events: Vec<&Event> = events.iter().collect();
    events.sort_by(|a, b| canonical_order(a, b));

    if events.len() < MIN_REGION_EVENTS {
        return insufficient(InsufficientReason::TooFewEvents {
            found: events.len(),
            required: MIN_REGION_EVENTS,
        });
    }

    let significant: Vec<&Event> = events.iter().copied().filter(|e| e.is_significant()).collect();
    let major_events = events.iter().filter(|e| e.is_major()).count();

    if significant.len() < MIN_SIGNIFICANT_EVENTS {
        return insufficient(InsufficientReason::TooFewSignificant {
            found: significant.len(),
            required: MIN_SIGNIFICANT_EVENTS,
        });
    }

    let data_quality = quality::assess(&significant, now);

    let raw = day_intervals(&significant);
    let kept = filter_intervals(&raw);
    if kept.len() < MIN_INTERVALS {
        return insufficient(InsufficientReason::TooFewIntervals {
            found: kept.len(),
            required: MIN_INTERVALS,
        });
    }

    let kept_days: Vec<f64> = kept.iter().map(|&d| d as f64).collect();
    let intervals = IntervalStats {
        mean_days: stats::mean(&kept_days),
        median_days: stats::median(&kept_days),
        std_days: stats::sample_std(&kept_days),
        raw_count: raw.len(),
        intervals: kept,
    };

    let seasonality = seasonal_pattern(&significant);
    let frequency = frequencies(&significant, now);
    let magnitude = magnitude_stats(&significant, now);
    let depth = depth_stats(&significant);

    let consistency = ConsistencyMetrics {
        temporal: spread_consistency(intervals.std_days, intervals.mean_days),
        magnitude: spread_consistency(magnitude.std, magnitude.mean),
        depth: (depth.shallow_count.max(depth.deep_count) as f64 / significant.len() as f64)
            .clamp(0.0, 1.0),
        seasonal: seasonality.confidence.clamp(0.0, 1.0),
    };

    log::debug!(
        "Analyzed {} events ({} significant): median interval {:.0} days, quality {}",
        events.len(),
        significant.len(),
        intervals.median_days,
        data_quality.score
    );

    AnalysisOutcome::Ready(PatternAnalysis {
        total_events: events.len(),
        significant_events: significant.len(),
        major_events,
        intervals,
        seasonality,
        magnitude,
        depth,
        frequency,
        last_significant: significant.last().map(|e| e.occurred_at),
        data_quality,
        consistency,
    })
}

const fn insufficient(reason: InsufficientReason) -> AnalysisOutcome {
    AnalysisOutcome::InsufficientData { reason }
}

/// Total order over events: time first, then the remaining fields.
fn canonical_order(a: &Event, b: &Event) -> Ordering {
    a.occurred_at
        .cmp(&b.occurred_at)
        .then_with(|| a.magnitude.total_cmp(&b.magnitude))
        .then_with(|| a.latitude.total_cmp(&b.latitude))
        .then_with(|| a.longitude.total_cmp(&b.longitude))
        .then_with(|| a.depth_km.total_cmp(&b.depth_km))
        .then_with(|| a.place.cmp(&b.place))
}

/// Whole days between consecutive (time-ordered) events.
fn day_intervals(events: &[&Event]) -> Vec<i64> {
    events
        .windows(2)
        .map(|w| (w[1].occurred_at - w[0].occurred_at).num_days())
        .collect()
}

/// Drops implausible recurrence intervals.
///
/// With four or more intervals an IQR fence (clamped to 30 days..20
/// years) is tried first; if it keeps fewer than `max(3, half)` of them,
/// or with fewer than four intervals, a fixed 30 days..10 years window is
/// used instead.
fn filter_intervals(raw: &[i64]) -> Vec<i64> {
    let within = |lo: f64, hi: f64| -> Vec<i64> {
        raw.iter()
            .copied()
            .filter(|&d| (lo..=hi).contains(&(d as f64)))
            .collect()
    };

    if raw.len() <= 3 {
        return within(MIN_INTERVAL_DAYS, MAX_FIXED_INTERVAL_DAYS);
    }

    let days: Vec<f64> = raw.iter().map(|&d| d as f64).collect();
    let q1 = stats::quantile(&days, 0.25);
    let q3 = stats::quantile(&days, 0.75);
    let iqr = q3 - q1;
    let lower = (1.5f64.mul_add(-iqr, q1)).max(MIN_INTERVAL_DAYS);
    let upper = (1.5f64.mul_add(iqr, q3)).min(MAX_IQR_INTERVAL_DAYS);

    let kept = within(lower, upper);
    let needed = 3f64.max(raw.len() as f64 * 0.5);
    if (kept.len() as f64) < needed {
        log::debug!(
            "IQR filter kept {}/{} intervals, using fixed bounds",
            kept.len(),
            raw.len()
        );
        return within(MIN_INTERVAL_DAYS, MAX_FIXED_INTERVAL_DAYS);
    }
    kept
}

fn seasonal_pattern(significant: &[&Event]) -> SeasonalPattern {
    let mut monthly: BTreeMap<u32, usize> = BTreeMap::new();
    for event in significant {
        *monthly.entry(event.month()).or_default() += 1;
    }

    let counts: Vec<f64> = monthly.values().map(|&c| c as f64).collect();
    let threshold = 0.5f64.mul_add(stats::sample_std(&counts), stats::mean(&counts));
    let mut peak_months: Vec<u32> = monthly
        .iter()
        .filter(|&(_, &c)| c as f64 >= threshold)
        .map(|(&m, _)| m)
        .collect();

    if peak_months.is_empty() {
        let mut ranked: Vec<(u32, usize)> = monthly.iter().map(|(&m, &c)| (m, c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        peak_months = ranked.into_iter().take(3).map(|(m, _)| m).collect();
    }

    let mut seasons = SeasonCounts::default();
    for (&month, &count) in &monthly {
        match Season::of_month(month) {
            Season::Winter => seasons.winter += count,
            Season::Spring => seasons.spring += count,
            Season::Summer => seasons.summer += count,
            Season::Autumn => seasons.autumn += count,
        }
    }

    let mut peak_season = Season::Winter;
    for season in Season::ALL {
        if seasons.get(season) > seasons.get(peak_season) {
            peak_season = season;
        }
    }

    let total = seasons.total();
    let confidence = if total > 0 {
        seasons.get(peak_season) as f64 / total as f64
    } else {
        0.25
    };

    SeasonalPattern {
        monthly,
        seasons,
        peak_months,
        peak_season,
        confidence,
    }
}

fn frequencies(significant: &[&Event], now: DateTime<Utc>) -> FrequencyStats {
    let since = |years: i32| significant.iter().filter(|e| e.year() >= now.year() - years).count();
    FrequencyStats {
        per_year_5yr: since(5) as f64 / 5.0,
        per_year_20yr: since(20) as f64 / 20.0,
    }
}

fn magnitude_stats(significant: &[&Event], now: DateTime<Utc>) -> MagnitudeStats {
    let magnitudes: Vec<f64> = significant.iter().map(|e| e.magnitude).collect();
    let mean = stats::mean(&magnitudes);

    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for event in significant.iter().filter(|e| e.year() >= now.year() - 10) {
        by_year.entry(event.year()).or_default().push(event.magnitude);
    }
    let trend = if by_year.len() >= 3 {
        let yearly: Vec<f64> = by_year.values().map(|m| stats::mean(m)).collect();
        stats::mean(&yearly)
    } else {
        mean
    };

    MagnitudeStats {
        mean,
        max: magnitudes.iter().copied().fold(f64::MIN, f64::max),
        min: magnitudes.iter().copied().fold(f64::MAX, f64::min),
        std: stats::sample_std(&magnitudes),
        trend,
    }
}

fn depth_stats(significant: &[&Event]) -> DepthStats {
    let depths: Vec<f64> = significant.iter().map(|e| e.depth_km).collect();
    let shallow_count = depths.iter().filter(|&&d| d < SHALLOW_DEPTH_KM).count();
    DepthStats {
        mean_km: stats::mean(&depths),
        std_km: stats::sample_std(&depths),
        shallow_count,
        deep_count: depths.len() - shallow_count,
    }
}

/// `1 - std/mean`, clamped to `[0, 1]`; fixed at 0.8 for zero spread.
fn spread_consistency(std: f64, mean: f64) -> f64 {
    if std > 0.0 && mean > 0.0 {
        (1.0 - std / mean).clamp(0.0, 1.0)
    } else {
        ZERO_SPREAD_CONSISTENCY
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone as _};
    use quake_forecast_analytics_models::PatternStrength;
    use quake_forecast_catalog_models::Zone;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn event(occurred_at: DateTime<Utc>, magnitude: f64, depth_km: f64) -> Event {
        Event {
            occurred_at,
            latitude: 35.0,
            longitude: 139.0,
            depth_km,
            magnitude,
            place: None,
            zone: Zone::PacificRing,
        }
    }

    /// Twelve M5.0 events exactly 365 days apart, all in June.
    fn annual_june_events() -> Vec<Event> {
        let start = at(2010, 6, 15);
        (0..12)
            .map(|i| event(start + TimeDelta::days(365 * i), 5.0, 20.0))
            .collect()
    }

    fn ready(outcome: AnalysisOutcome) -> PatternAnalysis {
        match outcome {
            AnalysisOutcome::Ready(analysis) => analysis,
            AnalysisOutcome::InsufficientData { reason } => panic!("insufficient: {reason}"),
        }
    }

    /// A noisier region: irregular spacing, varied magnitudes and depths.
    fn mixed_events() -> Vec<Event> {
        let start = at(1990, 1, 3);
        let gaps = [
            120, 400, 95, 610, 230, 45, 380, 700, 150, 260, 330, 90, 520, 180, 410, 75, 290,
        ];
        let mut t = start;
        let mut events = Vec::new();
        for (i, gap) in gaps.iter().enumerate() {
            t += TimeDelta::days(*gap);
            let magnitude = 4.0 + (i % 7) as f64 * 0.35;
            let depth = if i % 4 == 0 { 110.0 } else { 15.0 + i as f64 };
            events.push(event(t, magnitude, depth));
            events.push(event(t + TimeDelta::hours(3), 3.2, 8.0));
        }
        events
    }

    #[test]
    fn annual_june_scenario() {
        let now = at(2024, 1, 1);
        let analysis = ready(analyze(&annual_june_events(), now));

        assert_eq!(analysis.seasonality.peak_months, vec![6]);
        assert_eq!(analysis.seasonality.peak_season, Season::Summer);
        assert!((analysis.seasonality.confidence - 1.0).abs() < 1e-12);
        assert!((analysis.intervals.mean_days - 365.0).abs() < 1e-9);
        assert!((analysis.intervals.median_days - 365.0).abs() < 1e-9);
        assert!(analysis.intervals.std_days.abs() < 1e-9);
        assert_eq!(analysis.intervals.intervals.len(), 11);
        assert!((analysis.consistency.temporal - 0.8).abs() < 1e-12);
        assert_eq!(
            PatternStrength::from_temporal_consistency(analysis.consistency.temporal),
            PatternStrength::Strong
        );
        assert_eq!(analysis.significant_events, 12);
        assert_eq!(analysis.major_events, 12);
        assert!((analysis.magnitude.trend - 5.0).abs() < 1e-12);
    }

    #[test]
    fn input_order_does_not_matter() {
        let now = at(2024, 1, 1);
        let events = mixed_events();
        let mut reversed = events.clone();
        reversed.reverse();
        let mut shuffled = events.clone();
        shuffled.rotate_left(7);
        shuffled.swap(0, 20);

        let baseline = analyze(&events, now);
        assert!(baseline.analysis().is_some());
        assert_eq!(analyze(&reversed, now), baseline);
        assert_eq!(analyze(&shuffled, now), baseline);
    }

    #[test]
    fn too_few_region_events() {
        let events: Vec<Event> = annual_june_events().into_iter().take(9).collect();
        assert_eq!(
            analyze(&events, at(2024, 1, 1)),
            AnalysisOutcome::InsufficientData {
                reason: InsufficientReason::TooFewEvents {
                    found: 9,
                    required: MIN_REGION_EVENTS
                }
            }
        );
    }

    #[test]
    fn too_few_significant_events() {
        let start = at(2000, 1, 1);
        let events: Vec<Event> = (0..20)
            .map(|i| {
                let magnitude = if i < 4 { 4.5 } else { 3.5 };
                event(start + TimeDelta::days(100 * i), magnitude, 10.0)
            })
            .collect();
        assert!(matches!(
            analyze(&events, at(2024, 1, 1)),
            AnalysisOutcome::InsufficientData {
                reason: InsufficientReason::TooFewSignificant { found: 4, .. }
            }
        ));
    }

    #[test]
    fn clustered_events_have_too_few_intervals() {
        let start = at(2000, 1, 1);
        let events: Vec<Event> = (0..12)
            .map(|i| event(start + TimeDelta::days(2 * i), 4.5, 10.0))
            .collect();
        assert!(matches!(
            analyze(&events, at(2024, 1, 1)),
            AnalysisOutcome::InsufficientData {
                reason: InsufficientReason::TooFewIntervals { found: 0, .. }
            }
        ));
    }

    #[test]
    fn empty_region_is_insufficient() {
        assert!(analyze(&[], at(2024, 1, 1)).analysis().is_none());
    }

    #[test]
    fn iqr_filter_drops_outliers() {
        let raw = vec![360, 365, 370, 362, 368, 5000];
        assert_eq!(filter_intervals(&raw), vec![360, 365, 370, 362, 368]);
    }

    #[test]
    fn iqr_filter_falls_back_to_fixed_bounds() {
        // Fence is [30, 247.5]: two survivors out of seven is too few, so the
        // fixed window applies and 3000 comes back.
        let raw = vec![10, 10, 10, 10, 100, 110, 3000];
        assert_eq!(filter_intervals(&raw), vec![100, 110, 3000]);
    }

    #[test]
    fn few_intervals_use_fixed_bounds() {
        assert_eq!(filter_intervals(&[10, 100, 4000]), vec![100]);
    }

    #[test]
    fn peak_months_clear_threshold() {
        // Eleven months at one event, June at two: threshold clears only June.
        let mut events: Vec<Event> = (1..=12).map(|m| event(at(2001, m, 1), 4.5, 10.0)).collect();
        events.push(event(at(2002, 6, 1), 4.5, 10.0));
        let refs: Vec<&Event> = events.iter().collect();
        assert_eq!(seasonal_pattern(&refs).peak_months, vec![6]);
    }

    #[test]
    fn peak_month_fallback_picks_top_three() {
        // Feb..Dec at five events each, January at one: the threshold lands
        // above five, so nothing qualifies.
        let mut events: Vec<Event> = (2..=12)
            .flat_map(|m| (2001..=2005).map(move |y| event(at(y, m, 1), 4.5, 10.0)))
            .collect();
        events.push(event(at(2001, 1, 1), 4.5, 10.0));
        let refs: Vec<&Event> = events.iter().collect();
        assert_eq!(seasonal_pattern(&refs).peak_months, vec![2, 3, 4]);
    }

    #[test]
    fn season_ties_resolve_in_calendar_order() {
        let events = [
            event(at(2001, 1, 1), 4.5, 10.0),
            event(at(2001, 7, 1), 4.5, 10.0),
        ];
        let refs: Vec<&Event> = events.iter().collect();
        let pattern = seasonal_pattern(&refs);
        assert_eq!(pattern.peak_season, Season::Winter);
        assert!((pattern.confidence - 0.5).abs() < 1e-12);
        assert_eq!(pattern.peak_months, vec![1, 7]);
    }

    #[test]
    fn frequencies_use_calendar_year_windows() {
        let now = at(2024, 3, 1);
        let events = [
            event(at(2003, 12, 31), 4.5, 10.0),
            event(at(2004, 1, 1), 4.5, 10.0),
            event(at(2019, 1, 1), 4.5, 10.0),
            event(at(2023, 5, 1), 4.5, 10.0),
        ];
        let refs: Vec<&Event> = events.iter().collect();
        let freq = frequencies(&refs, now);
        assert!((freq.per_year_20yr - 3.0 / 20.0).abs() < 1e-12);
        assert!((freq.per_year_5yr - 2.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn magnitude_trend_needs_three_distinct_years() {
        let now = at(2024, 1, 1);
        let two_years = [
            event(at(2020, 1, 1), 4.0, 10.0),
            event(at(2020, 2, 1), 4.0, 10.0),
            event(at(2021, 1, 1), 6.0, 10.0),
            event(at(2001, 1, 1), 5.0, 10.0),
        ];
        let refs: Vec<&Event> = two_years.iter().collect();
        let stats = magnitude_stats(&refs, now);
        assert!((stats.trend - stats.mean).abs() < 1e-12);

        let three_years = [
            event(at(2020, 1, 1), 4.0, 10.0),
            event(at(2020, 2, 1), 5.0, 10.0),
            event(at(2021, 1, 1), 6.0, 10.0),
            event(at(2022, 1, 1), 5.0, 10.0),
        ];
        let refs: Vec<&Event> = three_years.iter().collect();
        let stats = magnitude_stats(&refs, now);
        // Per-year means 4.5, 6.0, 5.0.
        assert!((stats.trend - 15.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn metrics_stay_in_unit_interval_and_quality_in_range() {
        let analysis = ready(analyze(&mixed_events(), at(2024, 1, 1)));
        for metric in [
            analysis.consistency.temporal,
            analysis.consistency.magnitude,
            analysis.consistency.depth,
            analysis.consistency.seasonal,
        ] {
            assert!((0.0..=1.0).contains(&metric), "{metric}");
        }
        assert!(analysis.data_quality.score <= 100);
        assert_eq!(
            analysis.depth.shallow_count + analysis.depth.deep_count,
            analysis.significant_events
        );
        assert_eq!(analysis.total_events, 34);
        assert_eq!(analysis.significant_events, 17);
    }
}
