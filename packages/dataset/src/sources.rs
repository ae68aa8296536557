//! Point-feature source CSV parsing.
//!
//! Every source needs `latitude` and `longitude` columns. Crime files also
//! need `is_violent_offense` and subway files need `station_name`. Rows
//! whose coordinates or required attributes cannot be parsed are dropped.

use std::io::Read;
use std::path::Path;

use desirability_source_models::{PointDetail, SourceDataset, SourceKind, SourcePoint};
use serde::Deserialize;

use crate::{DatasetError, require_columns};

/// Name of the violent-offense flag column in crime files.
pub const VIOLENT_COLUMN: &str = "is_violent_offense";
/// Name of the station name column in subway files.
pub const STATION_COLUMN: &str = "station_name";

/// Columns a source file of the given kind must carry.
#[must_use]
pub fn required_columns(kind: SourceKind) -> &'static [&'static str] {
    match kind {
        SourceKind::Crime => &["latitude", "longitude", VIOLENT_COLUMN],
        SourceKind::Grocery | SourceKind::Restaurant => &["latitude", "longitude"],
        SourceKind::Subway => &["latitude", "longitude", STATION_COLUMN],
    }
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    is_violent_offense: Option<String>,
    #[serde(default)]
    station_name: Option<String>,
}

/// Parses a boolean flag written as `1`/`0`, `true`/`false`, or `t`/`f`.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn to_point(kind: SourceKind, id: u64, raw: RawPoint) -> Option<SourcePoint> {
    let detail = match kind {
        SourceKind::Crime => PointDetail::Crime {
            violent: raw.is_violent_offense.as_deref().and_then(parse_flag)?,
        },
        SourceKind::Grocery => PointDetail::Grocery,
        SourceKind::Restaurant => PointDetail::Restaurant,
        SourceKind::Subway => PointDetail::Subway {
            station_name: raw
                .station_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())?,
        },
    };

    Some(SourcePoint {
        id,
        latitude: raw.latitude?,
        longitude: raw.longitude?,
        detail,
    })
}

/// Parses a source dataset from any CSV reader.
///
/// # Errors
///
/// Returns [`DatasetError::MissingColumn`] if a required column is absent,
/// or [`DatasetError::Csv`] if the header cannot be read.
pub fn parse_source(
    kind: SourceKind,
    reader: impl Read,
    origin: &Path,
) -> Result<SourceDataset, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| DatasetError::csv(origin, e))?;
    require_columns(origin, headers, required_columns(kind))?;

    let mut points = Vec::new();
    let mut dropped = 0u64;

    for (id, result) in (0u64..).zip(csv_reader.deserialize::<RawPoint>()) {
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("[{kind}] skipping malformed row {id}: {e}");
                dropped += 1;
                continue;
            }
        };
        match to_point(kind, id, raw) {
            Some(point) => points.push(point),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::warn!("[{kind}] dropped {dropped} rows with missing coordinates or attributes");
    }

    Ok(SourceDataset::new(kind, points))
}

/// Loads a source dataset from a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or lacks a required
/// column.
pub fn load_source(kind: SourceKind, path: &Path) -> Result<SourceDataset, DatasetError> {
    let file = std::fs::File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let dataset = parse_source(kind, std::io::BufReader::new(file), path)?;
    log::info!(
        "[{kind}] loaded {} points from {}",
        dataset.len(),
        path.display()
    );
    Ok(dataset)
}
