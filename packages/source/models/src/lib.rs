#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Point-feature source kinds and the target columns they contribute.
//!
//! Every source dataset (crime incidents, grocery stores, restaurants,
//! subway entrances) is parsed into [`SourcePoint`] records. Each
//! [`SourceKind`] declares a disjoint set of [`Target`] columns that it
//! contributes to the per-block aggregation table.

use strum_macros::{AsRefStr, Display, EnumString};

/// A numeric per-block feature summed over in-range candidates.
///
/// Variant order is the fixed output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum Target {
    /// Total crime incidents.
    NumCrime,
    /// Crime incidents flagged as violent offenses.
    NumViolent,
    /// Grocery stores.
    NumGrocery,
    /// Restaurants.
    NumRestaurant,
    /// Subway stations (deduplicated by station name).
    NumSubway,
}

impl Target {
    /// Every target column, in output order.
    pub const ALL: &[Self] = &[
        Self::NumCrime,
        Self::NumViolent,
        Self::NumGrocery,
        Self::NumRestaurant,
        Self::NumSubway,
    ];

    /// Column header for this target (e.g. `"numCrime"`).
    #[must_use]
    pub fn column(&self) -> &str {
        self.as_ref()
    }
}

/// The kind of point-feature dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// Crime incident reports
    Crime,
    /// Grocery stores
    Grocery,
    /// Restaurant inspections
    Restaurant,
    /// Subway station entrances
    Subway,
}

impl SourceKind {
    /// Every source kind, in aggregation order.
    pub const ALL: &[Self] = &[Self::Crime, Self::Grocery, Self::Restaurant, Self::Subway];

    /// The target columns this source contributes, in output order.
    #[must_use]
    pub const fn targets(self) -> &'static [Target] {
        match self {
            Self::Crime => &[Target::NumCrime, Target::NumViolent],
            Self::Grocery => &[Target::NumGrocery],
            Self::Restaurant => &[Target::NumRestaurant],
            Self::Subway => &[Target::NumSubway],
        }
    }
}

/// Kind-specific attributes carried by a [`SourcePoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointDetail {
    /// A crime incident.
    Crime {
        /// Whether the offense is classified as violent.
        violent: bool,
    },
    /// A grocery store.
    Grocery,
    /// A restaurant.
    Restaurant,
    /// One entrance of a subway station.
    Subway {
        /// Station name shared by every entrance of the same station.
        station_name: String,
    },
}

impl PointDetail {
    /// The source kind this detail belongs to.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Crime { .. } => SourceKind::Crime,
            Self::Grocery => SourceKind::Grocery,
            Self::Restaurant => SourceKind::Restaurant,
            Self::Subway { .. } => SourceKind::Subway,
        }
    }
}

/// A raw point record from a source dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePoint {
    /// Zero-based row index within the source file.
    pub id: u64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Kind-specific attributes.
    pub detail: PointDetail,
}

impl SourcePoint {
    /// The source kind of this point.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        self.detail.kind()
    }
}

/// A named, ordered collection of points from one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDataset {
    /// Which source this is.
    pub kind: SourceKind,
    /// Points in file order.
    pub points: Vec<SourcePoint>,
}

impl SourceDataset {
    /// Creates a dataset, dropping any point whose detail belongs to a
    /// different source kind.
    #[must_use]
    pub fn new(kind: SourceKind, points: Vec<SourcePoint>) -> Self {
        let points = points.into_iter().filter(|p| p.kind() == kind).collect();
        Self { kind, points }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the dataset has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn target_sources_are_disjoint_and_complete() {
        for target in Target::ALL {
            let owners: Vec<_> = SourceKind::ALL
                .iter()
                .filter(|kind| kind.targets().contains(target))
                .collect();
            assert_eq!(owners.len(), 1, "{target:?} declared by {owners:?}");
        }
    }

    #[test]
    fn target_order_follows_source_order() {
        let flattened: Vec<Target> = SourceKind::ALL
            .iter()
            .flat_map(|kind| kind.targets().iter().copied())
            .collect();
        assert_eq!(flattened, Target::ALL);
    }

    #[test]
    fn target_column_round_trips_through_strum() {
        for target in Target::ALL {
            assert_eq!(Target::from_str(target.column()).unwrap(), *target);
        }
    }

    #[test]
    fn dataset_drops_foreign_points() {
        let points = vec![
            SourcePoint {
                id: 0,
                latitude: 40.7,
                longitude: -73.9,
                detail: PointDetail::Grocery,
            },
            SourcePoint {
                id: 1,
                latitude: 40.7,
                longitude: -73.9,
                detail: PointDetail::Restaurant,
            },
        ];
        let dataset = SourceDataset::new(SourceKind::Grocery, points);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.points[0].id, 0);
    }

    #[test]
    fn source_kind_parses_snake_case() {
        assert_eq!(SourceKind::from_str("subway").unwrap(), SourceKind::Subway);
        assert_eq!(SourceKind::Restaurant.to_string(), "restaurant");
    }
}
