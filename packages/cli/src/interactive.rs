//! Interactive region picker.
//!
//! Menu-driven alternative to the subcommands: pick a region, see its
//! recent activity and forecast, repeat.

use chrono::{DateTime, Utc};
use dialoguer::{Confirm, Select};
use quake_forecast_analytics::session::ForecastSession;
use rand::rngs::StdRng;

use crate::render;

/// What to show for the selected region.
enum View {
    Overview,
    RecentActivity,
    PatternAnalysis,
}

impl View {
    const ALL: &[Self] = &[Self::Overview, Self::RecentActivity, Self::PatternAnalysis];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Overview => "Recent activity and forecast",
            Self::RecentActivity => "Recent activity only",
            Self::PatternAnalysis => "Pattern analysis only",
        }
    }
}

/// Runs the menu loop until the user declines to continue.
///
/// # Errors
///
/// Returns an error if a prompt fails or the session rejects a request.
pub fn run(
    session: &mut ForecastSession,
    now: DateTime<Utc>,
    rng: &mut StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    let region_ids: Vec<String> = session
        .registry()
        .regions()
        .iter()
        .map(|r| r.id.clone())
        .collect();
    let region_labels: Vec<String> = session
        .registry()
        .regions()
        .iter()
        .map(|r| r.name.clone())
        .collect();
    let view_labels: Vec<&str> = View::ALL.iter().map(View::label).collect();

    loop {
        let region_idx = Select::new()
            .with_prompt("Select a region")
            .items(&region_labels)
            .default(0)
            .interact()?;
        let region_id = &region_ids[region_idx];

        let view_idx = Select::new()
            .with_prompt("What would you like to see?")
            .items(&view_labels)
            .default(0)
            .interact()?;

        println!();
        match View::ALL[view_idx] {
            View::Overview => {
                render::recent(&session.recent_activity(region_id, now)?);
                println!();
                render::region_forecast(&session.forecast(region_id, now, rng)?);
            }
            View::RecentActivity => render::recent(&session.recent_activity(region_id, now)?),
            View::PatternAnalysis => render::analysis(&session.analyze(region_id, now)?),
        }
        println!();

        let again = Confirm::new()
            .with_prompt("Look at another region?")
            .default(true)
            .interact()?;
        if !again {
            return Ok(());
        }
    }
}
