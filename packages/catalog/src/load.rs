//! Historical catalog CSV loader.
//!
//! Reads a tabular export with at least `time`, `latitude`, `longitude`,
//! `depth` and `magnitude` columns (optionally `place` and `zone`). Rows
//! that cannot be interpreted are dropped and counted; a missing file or
//! missing required column fails the whole load.

use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use quake_forecast_catalog_models::{Event, Zone};
use serde::Serialize;

use crate::parsing::{parse_event_time, parse_finite, parse_lat_lon};
use crate::{Catalog, CatalogError, zone};

/// Outcome counters for a catalog load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Rows turned into events (before deduplication).
    pub parsed: usize,
    /// Rows dropped because the timestamp could not be parsed.
    pub rejected_timestamps: usize,
    /// Rows dropped because a coordinate, depth or magnitude was missing
    /// or invalid.
    pub rejected_fields: usize,
    /// Parsed rows discarded as exact duplicates.
    pub duplicates: usize,
}

impl LoadReport {
    /// Total rows dropped for any reason.
    #[must_use]
    pub const fn rejected(&self) -> usize {
        self.rejected_timestamps + self.rejected_fields
    }
}

/// Column positions resolved from the header row.
struct Columns {
    time: usize,
    latitude: usize,
    longitude: usize,
    depth: usize,
    magnitude: usize,
    place: Option<usize>,
    zone: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, CatalogError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |column: &'static str, names: &[&str]| {
            find(names).ok_or(CatalogError::MissingColumn { column })
        };

        Ok(Self {
            time: require("time", &["time"])?,
            latitude: require("latitude", &["latitude", "lat"])?,
            longitude: require("longitude", &["longitude", "lon", "lng"])?,
            depth: require("depth", &["depth", "depth_km"])?,
            magnitude: require("magnitude", &["magnitude", "mag"])?,
            place: find(&["place"]),
            zone: find(&["zone"]),
        })
    }
}

enum RowError {
    Timestamp,
    Field,
}

/// Loads the catalog CSV at `path`.
///
/// # Errors
///
/// * [`CatalogError::NotFound`] if the file does not exist.
/// * [`CatalogError::MissingColumn`] if a required column is absent.
/// * [`CatalogError::Io`] / [`CatalogError::Csv`] if the file cannot be read.
pub fn load_csv(path: &Path) -> Result<(Catalog, LoadReport), CatalogError> {
    if !path.exists() {
        return Err(CatalogError::NotFound {
            path: path.to_path_buf(),
        });
    }

    log::info!("Loading catalog from {}", path.display());
    let file = std::fs::File::open(path)?;
    let (events, mut report) = read_events(file)?;

    let parsed = events.len();
    let catalog = Catalog::new(events);
    report.duplicates = parsed - catalog.len();

    log::info!(
        "Loaded {} events ({} rejected, {} duplicates)",
        catalog.len(),
        report.rejected(),
        report.duplicates
    );

    Ok((catalog, report))
}

/// Parses catalog rows from any reader.
///
/// Does not deduplicate; [`Catalog::new`] does that.
///
/// # Errors
///
/// Returns [`CatalogError`] if the header is unreadable, a required
/// column is missing, or the underlying reader fails.
pub fn read_events<R: Read>(reader: R) -> Result<(Vec<Event>, LoadReport), CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::resolve(reader.headers()?)?;
    let mut report = LoadReport::default();
    let mut events = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log::debug!("Dropping unreadable row {}: {e}", row + 1);
                report.rejected_fields += 1;
                continue;
            }
        };

        match parse_row(&record, &columns) {
            Ok(event) => events.push(event),
            Err(RowError::Timestamp) => {
                log::debug!("Dropping row {}: unparseable timestamp", row + 1);
                report.rejected_timestamps += 1;
            }
            Err(RowError::Field) => {
                log::debug!("Dropping row {}: missing or invalid field", row + 1);
                report.rejected_fields += 1;
            }
        }
    }

    if report.rejected() > 0 {
        log::warn!(
            "Dropped {} catalog rows ({} bad timestamps, {} bad fields)",
            report.rejected(),
            report.rejected_timestamps,
            report.rejected_fields
        );
    }

    report.parsed = events.len();
    Ok((events, report))
}

fn parse_row(record: &StringRecord, columns: &Columns) -> Result<Event, RowError> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let occurred_at = parse_event_time(field(columns.time)).ok_or(RowError::Timestamp)?;
    let (latitude, longitude) =
        parse_lat_lon(field(columns.latitude), field(columns.longitude)).ok_or(RowError::Field)?;
    let depth_km = parse_finite(field(columns.depth)).ok_or(RowError::Field)?;
    let magnitude = parse_finite(field(columns.magnitude)).ok_or(RowError::Field)?;

    let place = columns
        .place
        .map(field)
        .filter(|p| !p.is_empty())
        .map(str::to_owned);
    let zone = columns
        .zone
        .map(field)
        .and_then(Zone::from_label)
        .unwrap_or_else(|| zone::classify(latitude, longitude));

    Ok(Event {
        occurred_at,
        latitude,
        longitude,
        depth_km,
        magnitude,
        place,
        zone,
    })
}
