#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input and output for the desirability pipeline.
//!
//! Loads census blocks from `GeoJSON`, joins them to zip-level lookup
//! tables, parses point-feature source CSVs, and writes the per-block
//! output table. Also derives the price-per-zip table from rolling sales
//! files and the area-normalized model frame consumed by the external
//! regression step.

pub mod blocks;
pub mod config;
pub mod model_frame;
pub mod modzcta;
pub mod output;
pub mod price;
pub mod sales;
pub mod sources;

use thiserror::Error;

/// Errors that can occur while reading or writing pipeline data.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// I/O error reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parsing or writing error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// `GeoJSON` parsing error.
    #[error("GeoJSON error in {path}: {source}")]
    GeoJson {
        /// Path to the `GeoJSON` file.
        path: String,
        /// Underlying `GeoJSON` error.
        source: Box<geojson::Error>,
    },

    /// The block file was valid `GeoJSON` but not a feature collection.
    #[error("Expected a GeoJSON FeatureCollection in {path}")]
    NotFeatureCollection {
        /// Path to the `GeoJSON` file.
        path: String,
    },

    /// Pipeline configuration could not be parsed.
    #[error("Config error in {path}: {source}")]
    Config {
        /// Path to the config file.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A required column is absent from a CSV header.
    #[error("Missing column '{column}' in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: String,
        /// Name of the missing column.
        column: String,
    },

    /// Aggregation output does not line up with the block list.
    #[error("Row count mismatch: {blocks} blocks but {rows} aggregation rows")]
    RowCountMismatch {
        /// Number of blocks.
        blocks: usize,
        /// Number of aggregation rows.
        rows: usize,
    },
}

impl DatasetError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Fails with [`DatasetError::MissingColumn`] unless every name in
/// `required` appears in `headers`.
pub(crate) fn require_columns(
    path: &std::path::Path,
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<(), DatasetError> {
    for column in required {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(DatasetError::MissingColumn {
                path: path.display().to_string(),
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

/// Parses an integer that may have been written as a float (`"10001.0"`).
pub(crate) fn parse_int_like(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    let v = value.parse::<f64>().ok()?;
    #[allow(clippy::cast_possible_truncation)]
    (v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15).then_some(v as i64)
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::path::PathBuf;

    /// Writes `contents` to a fresh file under the system temp dir.
    pub fn write_temp(dir: &str, name: &str, contents: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(dir);
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_int_like_values() {
        assert_eq!(parse_int_like("10001"), Some(10_001));
        assert_eq!(parse_int_like(" 10001.0 "), Some(10_001));
        assert_eq!(parse_int_like("10001.5"), None);
        assert_eq!(parse_int_like(""), None);
        assert_eq!(parse_int_like("NaN"), None);
        assert_eq!(parse_int_like("abc"), None);
    }

    #[test]
    fn require_columns_reports_first_missing() {
        let headers = csv::StringRecord::from(vec!["latitude", " longitude "]);
        let path = std::path::Path::new("points.csv");
        assert!(require_columns(path, &headers, &["latitude", "longitude"]).is_ok());
        let err = require_columns(path, &headers, &["latitude", "station_name"]).unwrap_err();
        assert!(
            matches!(err, DatasetError::MissingColumn { ref column, .. } if column == "station_name"),
            "{err}"
        );
    }
}
