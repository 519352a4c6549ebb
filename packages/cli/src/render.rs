//! Plain-text rendering of analysis records.

use quake_forecast_analytics_models::{
    AnalysisOutcome, Forecast, PatternAnalysis, RecentActivity, RegionForecast,
};
use quake_forecast_catalog::registry::RegionRegistry;
use quake_forecast_catalog_models::Event;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTHS.get(i as usize))
        .copied()
        .unwrap_or("?")
}

fn month_list(months: &[u32]) -> String {
    months
        .iter()
        .map(|&m| month_name(m))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_event(event: &Event) -> String {
    format!(
        "M{:.1} on {} at {} ({:.1} km deep)",
        event.magnitude,
        event.occurred_at.format("%Y-%m-%d %H:%M UTC"),
        event.place.as_deref().unwrap_or("unknown location"),
        event.depth_km
    )
}

pub fn regions(registry: &RegionRegistry) {
    println!("{:<16} {:<20} {:>16} {:>18}", "ID", "NAME", "LATITUDE", "LONGITUDE");
    println!("{}", "-".repeat(73));
    for region in registry.regions() {
        let b = &region.bounds;
        println!(
            "{:<16} {:<20} {:>7.1} .. {:>5.1} {:>8.1} .. {:>6.1}",
            region.id, region.name, b.lat_min, b.lat_max, b.lon_min, b.lon_max
        );
    }
}

pub fn recent(activity: &RecentActivity) {
    let RecentActivity::Summary(summary) = activity else {
        println!("No recorded earthquakes in this region.");
        return;
    };

    println!("Recent activity: {}", summary.region_id);
    println!(
        "  Last 365 days: {} events M3.0+, {} events M4.0+",
        summary.total_recent, summary.significant_recent
    );
    match (&summary.latest, summary.days_since_latest) {
        (Some(event), Some(days)) => {
            println!("  Latest:             {} [{days} days ago]", describe_event(event));
        }
        _ => println!("  No events in the last 365 days."),
    }
    if let (Some(event), Some(days), Some(source)) = (
        &summary.latest_significant,
        summary.days_since_significant,
        summary.significant_source,
    ) {
        println!(
            "  Latest significant: {} [{days} days ago, from {source}]",
            describe_event(event)
        );
    }
}

pub fn analysis(outcome: &AnalysisOutcome) {
    match outcome {
        AnalysisOutcome::Ready(analysis) => pattern(analysis),
        AnalysisOutcome::InsufficientData { reason } => {
            println!("Insufficient data for pattern analysis: {reason}.");
        }
    }
}

fn pattern(analysis: &PatternAnalysis) {
    let i = &analysis.intervals;
    let m = &analysis.magnitude;
    let d = &analysis.depth;
    let c = &analysis.consistency;

    println!("Pattern analysis");
    println!(
        "  Events:        {} total, {} M4.0+, {} M5.0+",
        analysis.total_events, analysis.significant_events, analysis.major_events
    );
    println!(
        "  Interval:      mean {:.0} days ({:.1} yr), median {:.0}, std {:.0} ({} of {} kept)",
        i.mean_days,
        i.mean_years(),
        i.median_days,
        i.std_days,
        i.intervals.len(),
        i.raw_count
    );
    println!(
        "  Seasonality:   peak months {}; peak season {} ({:.0}%)",
        month_list(&analysis.seasonality.peak_months),
        analysis.seasonality.peak_season,
        analysis.seasonality.confidence * 100.0
    );
    println!(
        "  Magnitude:     mean {:.2}, range {:.1}..{:.1}, std {:.2}, trend {:.2}",
        m.mean, m.min, m.max, m.std, m.trend
    );
    println!(
        "  Depth:         mean {:.0} km, std {:.0}; {} shallow, {} deep",
        d.mean_km, d.std_km, d.shallow_count, d.deep_count
    );
    println!(
        "  Frequency:     {:.2}/yr (20 yr), {:.2}/yr (5 yr)",
        analysis.frequency.per_year_20yr, analysis.frequency.per_year_5yr
    );
    println!(
        "  Consistency:   temporal {:.2}, magnitude {:.2}, depth {:.2}, seasonal {:.2}",
        c.temporal, c.magnitude, c.depth, c.seasonal
    );
    println!("  Data quality:  {}/100", analysis.data_quality.score);
}

pub fn region_forecast(result: &RegionForecast) {
    match result {
        RegionForecast::Ready { analysis, forecast: f } => {
            pattern(analysis);
            println!();
            forecast(f);
        }
        RegionForecast::InsufficientData { reason } => {
            println!("Cannot forecast: {reason}.");
            println!("Need at least 5 significant earthquakes (M4.0+) for pattern analysis.");
        }
    }
}

fn forecast(f: &Forecast) {
    println!("Forecast: {}", f.region_id);
    println!(
        "  Predicted date:  {} (window {} to {})",
        f.predicted_date.format("%Y-%m-%d"),
        f.date_range.start.format("%Y-%m-%d"),
        f.date_range.end.format("%Y-%m-%d")
    );
    println!("  Magnitude:       M{:.1}", f.predicted_magnitude);
    println!("  Risk:            {} ({})", f.risk.level, f.risk.description);
    println!(
        "  Location:        {:.2}, {:.2} at {:.1} km",
        f.estimated_latitude, f.estimated_longitude, f.estimated_depth_km
    );
    println!("  Confidence:      {}%", f.confidence);
    println!(
        "  Pattern:         {} (expected interval {:.1} yr, {} days since last)",
        f.pattern_strength, f.expected_interval_years, f.days_since_last
    );
    println!(
        "  Peak months:     {} ({})",
        month_list(&f.peak_months),
        f.peak_season
    );
    let factors = &f.confidence_factors;
    let penalties = &f.confidence_penalties;
    println!(
        "  Factors:         volume {:.1}, regularity {}, recency {}, seasonal {}, geographic {}",
        factors.data_volume,
        factors.pattern_regularity,
        factors.data_recency,
        factors.seasonal_pattern,
        factors.geographic_consistency
    );
    println!(
        "  Penalties:       sparse {}, variability {}, outdated {}",
        penalties.sparse_data, penalties.high_variability, penalties.outdated_data
    );
}
