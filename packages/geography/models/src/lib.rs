#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census block types.
//!
//! A [`Block`] is the unit of analysis and the output row key. Blocks are
//! loaded once, joined to zip-code level attributes, and then treated as
//! read-only for the rest of the run.

use geo::MultiPolygon;

/// The five boroughs of New York City, as spelled in the block data.
pub const BOROUGHS: &[&str] = &["Manhattan", "Bronx", "Brooklyn", "Queens", "Staten Island"];

/// A 2020 census block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Borough-scoped block code (`bctcb2020`).
    pub code: String,
    /// Full census GEOID for the block.
    pub geoid: i64,
    /// Borough name (e.g. "Brooklyn").
    pub borough: String,
    /// Block area in the source projection's square units (`shape_area`).
    pub area: f64,
    /// Block boundary (WGS84).
    pub polygon: MultiPolygon<f64>,
    /// Modified ZCTA the block belongs to, attached by the zip lookup join.
    pub modzcta: Option<i64>,
    /// Percentage of households without internet access in the block's
    /// modified ZCTA, attached by the internet join.
    pub perc_no_internet: Option<f64>,
}

/// Non-geometric block attributes as written to the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAttributes {
    /// Borough-scoped block code.
    pub bctcb2020: String,
    /// Full census GEOID.
    pub geoid: i64,
    /// Borough name.
    pub boroname: String,
    /// Block area.
    pub shape_area: f64,
    /// Modified ZCTA.
    pub modzcta: Option<i64>,
    /// Percentage of households without internet access.
    pub perc_no_internet: Option<f64>,
    /// Centroid latitude, absent for degenerate geometry.
    pub centroid_lat: Option<f64>,
    /// Centroid longitude, absent for degenerate geometry.
    pub centroid_lon: Option<f64>,
}

impl BlockAttributes {
    /// Column headers in output order.
    pub const COLUMNS: &[&str] = &[
        "bctcb2020",
        "geoid",
        "boroname",
        "shape_area",
        "modzcta",
        "perc_no_internet",
        "centroid_lat",
        "centroid_lon",
    ];

    /// Builds the output attributes for a block given its centroid as
    /// `(lat, lon)`.
    #[must_use]
    pub fn new(block: &Block, centroid: Option<(f64, f64)>) -> Self {
        Self {
            bctcb2020: block.code.clone(),
            geoid: block.geoid,
            boroname: block.borough.clone(),
            shape_area: block.area,
            modzcta: block.modzcta,
            perc_no_internet: block.perc_no_internet,
            centroid_lat: centroid.map(|(lat, _)| lat),
            centroid_lon: centroid.map(|(_, lon)| lon),
        }
    }

    /// Field values in [`Self::COLUMNS`] order.
    #[must_use]
    pub fn to_record(&self) -> Vec<String> {
        fn opt<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }

        vec![
            self.bctcb2020.clone(),
            self.geoid.to_string(),
            self.boroname.clone(),
            self.shape_area.to_string(),
            opt(self.modzcta),
            opt(self.perc_no_internet),
            opt(self.centroid_lat),
            opt(self.centroid_lon),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Block {
        Block {
            code: "1000100".to_string(),
            geoid: 360_610_001_001_000,
            borough: "Manhattan".to_string(),
            area: 12_500.5,
            polygon: MultiPolygon(vec![]),
            modzcta: Some(10_004),
            perc_no_internet: None,
        }
    }

    #[test]
    fn record_matches_columns() {
        let attrs = BlockAttributes::new(&block(), Some((40.7, -74.0)));
        let record = attrs.to_record();
        assert_eq!(record.len(), BlockAttributes::COLUMNS.len());
        assert_eq!(record[0], "1000100");
        assert_eq!(record[4], "10004");
        assert_eq!(record[5], "");
        assert_eq!(record[6], "40.7");
        assert_eq!(record[7], "-74");
    }
}
