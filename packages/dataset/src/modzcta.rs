//! Modified ZCTA lookup for assigning sales to zip areas.
//!
//! Each row of the table names a modified ZCTA and the zip codes it covers,
//! split across a `label` and a `zcta` column as comma-separated lists. A
//! zip code may appear under more than one row; the first listed row wins.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::DatasetError;

#[derive(Debug, Deserialize)]
struct RawModZcta {
    modzcta: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    zcta: Option<String>,
}

/// One modified ZCTA and the zip codes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModZcta {
    /// Modified ZCTA code.
    pub modzcta: i64,
    /// Zip codes covered, label codes first.
    pub zips: Vec<i64>,
}

/// Ordered modified ZCTA table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModZctaTable {
    rows: Vec<ModZcta>,
}

fn parse_zip_list(list: &str) -> Option<Vec<i64>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(crate::parse_int_like)
        .collect()
}

impl ModZctaTable {
    /// Builds a table from rows in priority order.
    #[must_use]
    pub const fn new(rows: Vec<ModZcta>) -> Self {
        Self { rows }
    }

    /// Parses the table from CSV with `modzcta`, `label` and `zcta` columns.
    ///
    /// Rows whose code or zip lists cannot be parsed are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::MissingColumn`] if a column is absent or
    /// [`DatasetError::Csv`] if the header cannot be read.
    pub fn parse(reader: impl Read, origin: &Path) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|e| DatasetError::csv(origin, e))?;
        crate::require_columns(origin, headers, &["modzcta", "label", "zcta"])?;

        let mut rows = Vec::new();
        for (i, result) in csv_reader.deserialize::<RawModZcta>().enumerate() {
            let parsed = result.ok().and_then(|raw| {
                let modzcta = crate::parse_int_like(&raw.modzcta)?;
                let mut zips = parse_zip_list(raw.label.as_deref()?)?;
                zips.extend(parse_zip_list(raw.zcta.as_deref()?)?);
                Some(ModZcta { modzcta, zips })
            });
            match parsed {
                Some(row) => rows.push(row),
                None => log::warn!("Skipping unparseable ModZCTA row {i} in {}", origin.display()),
            }
        }

        Ok(Self { rows })
    }

    /// Loads the table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|e| DatasetError::io(path, e))?;
        let table = Self::parse(std::io::BufReader::new(file), path)?;
        log::info!("Loaded {} ModZCTA rows from {}", table.len(), path.display());
        Ok(table)
    }

    /// The modified ZCTA of the first row covering `zip`.
    #[must_use]
    pub fn assign(&self, zip: i64) -> Option<i64> {
        self.rows
            .iter()
            .find(|row| row.zips.contains(&zip))
            .map(|row| row.modzcta)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "modzcta,label,zcta,pop_est\n\
                         10001,\"10001, 10118\",\"10001, 10119, 10199\",23072\n\
                         10002,10002,10002,74993\n\
                         10118,10118,10118,0\n\
                         99999,,,0\n";

    fn table() -> ModZctaTable {
        ModZctaTable::parse(TABLE.as_bytes(), Path::new("modzcta.csv")).unwrap()
    }

    #[test]
    fn parses_zip_lists_and_skips_incomplete_rows() {
        let table = table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].zips, vec![10_001, 10_118, 10_001, 10_119, 10_199]);
    }

    #[test]
    fn first_listed_row_wins() {
        let table = table();
        assert_eq!(table.assign(10_118), Some(10_001));
        assert_eq!(table.assign(10_199), Some(10_001));
        assert_eq!(table.assign(10_002), Some(10_002));
    }

    #[test]
    fn unknown_zip_is_unassigned() {
        assert_eq!(table().assign(11_215), None);
    }

    #[test]
    fn missing_zcta_column_is_an_error() {
        let err = ModZctaTable::parse("modzcta,label\n1,1\n".as_bytes(), Path::new("m.csv"))
            .unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }), "{err}");
    }
}
