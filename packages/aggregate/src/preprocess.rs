//! Source preprocessing: raw points to per-block summary rows.
//!
//! Each point is attached to the block that contains it, then points are
//! grouped by block. A group becomes one [`SummaryRow`] holding the
//! group's target sums plus the borough and location of its first point,
//! which stand in for the group during catchment counting.

use std::collections::{BTreeMap, BTreeSet};

use desirability_geography_models::Block;
use desirability_source_models::{PointDetail, SourceDataset, SourceKind, SourcePoint};

/// One block's worth of a source, reduced to target sums.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Code of the block containing the group.
    pub block_code: String,
    /// Borough of that block.
    pub borough: String,
    /// `(lat, lon)` of the first point in the group.
    pub location: (f64, f64),
    /// Target sums, aligned with [`SourceKind::targets`].
    pub values: Vec<u64>,
}

/// A preprocessed source, with summary rows grouped by borough.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    kind: SourceKind,
    by_borough: BTreeMap<String, Vec<SummaryRow>>,
}

impl SourceSummary {
    /// Which source this summary was built from.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Summary rows whose borough equals `borough`, ordered by block code.
    #[must_use]
    pub fn candidates(&self, borough: &str) -> &[SummaryRow] {
        self.by_borough
            .get(borough)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every summary row, grouped by borough name.
    pub fn rows(&self) -> impl Iterator<Item = &SummaryRow> {
        self.by_borough.values().flatten()
    }

    /// Total number of summary rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_borough.values().map(Vec::len).sum()
    }

    /// Whether no point landed in any block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Contribution of a single point to each of its source's targets.
fn point_values(point: &SourcePoint) -> Vec<u64> {
    match &point.detail {
        PointDetail::Crime { violent } => vec![1, u64::from(*violent)],
        PointDetail::Grocery | PointDetail::Restaurant | PointDetail::Subway { .. } => vec![1],
    }
}

/// Keeps the first point for each subway station name.
///
/// Entrances of the same station share a name, so only one entrance per
/// station survives. Non-subway points pass through unchanged.
#[must_use]
pub fn dedup_stations(points: &[SourcePoint]) -> Vec<&SourcePoint> {
    let mut seen = BTreeSet::new();
    points
        .iter()
        .filter(|point| match &point.detail {
            PointDetail::Subway { station_name } => seen.insert(station_name.as_str()),
            _ => true,
        })
        .collect()
}

/// Groups a dataset's points by containing block.
///
/// `block_of` returns the position in `blocks` of the block that contains a
/// point, or `None` when the point lies in no block; such points are dropped.
/// Subway points are deduplicated by station name before grouping.
pub fn aggregate_exact<F>(dataset: &SourceDataset, blocks: &[Block], block_of: F) -> SourceSummary
where
    F: Fn(&SourcePoint) -> Option<usize>,
{
    let points: Vec<&SourcePoint> = if dataset.kind == SourceKind::Subway {
        let deduped = dedup_stations(&dataset.points);
        log::debug!(
            "[{}] {} entrances reduced to {} stations",
            dataset.kind,
            dataset.len(),
            deduped.len()
        );
        deduped
    } else {
        dataset.points.iter().collect()
    };

    let width = dataset.kind.targets().len();
    let mut groups: BTreeMap<&str, SummaryRow> = BTreeMap::new();
    let mut unlocated = 0u64;

    for point in points {
        let Some(block) = block_of(point).and_then(|i| blocks.get(i)) else {
            unlocated += 1;
            continue;
        };

        let row = groups
            .entry(block.code.as_str())
            .or_insert_with(|| SummaryRow {
                block_code: block.code.clone(),
                borough: block.borough.clone(),
                location: (point.latitude, point.longitude),
                values: vec![0; width],
            });

        for (sum, value) in row.values.iter_mut().zip(point_values(point)) {
            *sum += value;
        }
    }

    if unlocated > 0 {
        log::warn!(
            "[{}] dropped {unlocated} points outside every block",
            dataset.kind
        );
    }

    let mut by_borough: BTreeMap<String, Vec<SummaryRow>> = BTreeMap::new();
    for row in groups.into_values() {
        by_borough.entry(row.borough.clone()).or_default().push(row);
    }

    let summary = SourceSummary {
        kind: dataset.kind,
        by_borough,
    };
    log::info!(
        "[{}] {} points summarized into {} block rows",
        dataset.kind,
        dataset.len(),
        summary.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use geo::MultiPolygon;

    use super::*;

    fn block(code: &str, borough: &str) -> Block {
        Block {
            code: code.to_string(),
            geoid: 0,
            borough: borough.to_string(),
            area: 1.0,
            polygon: MultiPolygon(vec![]),
            modzcta: None,
            perc_no_internet: None,
        }
    }

    fn point(id: u64, detail: PointDetail) -> SourcePoint {
        SourcePoint {
            id,
            latitude: 40.0 + id as f64 * 0.001,
            longitude: -73.9,
            detail,
        }
    }

    fn subway(id: u64, name: &str) -> SourcePoint {
        point(
            id,
            PointDetail::Subway {
                station_name: name.to_string(),
            },
        )
    }

    #[test]
    fn crime_counts_rows_and_violent_flags() {
        let blocks = vec![block("X", "Bronx"), block("Y", "Bronx")];
        let dataset = SourceDataset::new(
            SourceKind::Crime,
            vec![
                point(0, PointDetail::Crime { violent: false }),
                point(1, PointDetail::Crime { violent: true }),
                point(2, PointDetail::Crime { violent: false }),
            ],
        );

        let summary = aggregate_exact(&dataset, &blocks, |_| Some(0));
        let rows = summary.candidates("Bronx");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].block_code, "X");
        assert_eq!(rows[0].values, vec![3, 1]);
    }

    #[test]
    fn group_carries_first_point_location_and_block_borough() {
        let blocks = vec![block("A", "Queens")];
        let dataset = SourceDataset::new(
            SourceKind::Grocery,
            vec![point(5, PointDetail::Grocery), point(7, PointDetail::Grocery)],
        );

        let summary = aggregate_exact(&dataset, &blocks, |_| Some(0));
        let row = &summary.candidates("Queens")[0];
        assert_eq!(row.borough, "Queens");
        assert!((row.location.0 - 40.005).abs() < 1e-12);
        assert_eq!(row.values, vec![2]);
        assert!(summary.candidates("Bronx").is_empty());
    }

    #[test]
    fn drops_points_outside_blocks() {
        let blocks = vec![block("A", "Queens")];
        let dataset = SourceDataset::new(
            SourceKind::Restaurant,
            vec![
                point(0, PointDetail::Restaurant),
                point(1, PointDetail::Restaurant),
            ],
        );

        let summary = aggregate_exact(&dataset, &blocks, |p| (p.id == 0).then_some(0));
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.candidates("Queens")[0].values, vec![1]);
    }

    #[test]
    fn shared_station_name_counts_once() {
        let blocks = vec![block("A", "Manhattan")];
        let dataset = SourceDataset::new(
            SourceKind::Subway,
            vec![subway(0, "14th St"), subway(1, "14th St")],
        );

        let summary = aggregate_exact(&dataset, &blocks, |_| Some(0));
        assert_eq!(summary.candidates("Manhattan")[0].values, vec![1]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let blocks = vec![block("A", "Brooklyn"), block("B", "Brooklyn")];
        let duplicated = SourceDataset::new(
            SourceKind::Subway,
            vec![
                subway(0, "Atlantic Av"),
                subway(1, "Atlantic Av"),
                subway(2, "Bergen St"),
                subway(3, "Atlantic Av"),
            ],
        );
        let deduped = SourceDataset::new(
            SourceKind::Subway,
            dedup_stations(&duplicated.points)
                .into_iter()
                .cloned()
                .collect(),
        );
        let block_of = |p: &SourcePoint| Some(usize::from(p.id >= 2));

        let a = aggregate_exact(&duplicated, &blocks, block_of);
        let b = aggregate_exact(&deduped, &blocks, block_of);
        assert_eq!(a, b);
        let total: u64 = a.rows().map(|r| r.values[0]).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let points = vec![subway(3, "Court Sq"), subway(1, "Court Sq")];
        let kept = dedup_stations(&points);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 3);
    }
}
