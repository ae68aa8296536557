//! Catchment counting for a single block.

use std::collections::BTreeMap;
use std::ops::Range;

use desirability_geography_models::Block;
use desirability_source_models::Target;
use desirability_spatial::{centroid, distance};

use crate::preprocess::SourceSummary;
use crate::progress::ProgressCallback;

/// Walking catchment radius in meters.
///
/// A 15 minute walk at 4 mph covers 1610 m; dividing by sqrt(2) penalizes
/// straight-line distance toward street-grid (L1) routing.
pub const CATCHMENT_RADIUS_M: f64 = 1138.0;

/// Target sums for one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationRow {
    values: BTreeMap<Target, u64>,
}

impl AggregationRow {
    /// A row holding zero for every target declared by `sources`.
    #[must_use]
    pub fn zeroed(sources: &[SourceSummary]) -> Self {
        let values = sources
            .iter()
            .flat_map(|s| s.kind().targets().iter().map(|t| (*t, 0)))
            .collect();
        Self { values }
    }

    /// Value for `target`, or `None` if no source declared it.
    #[must_use]
    pub fn get(&self, target: Target) -> Option<u64> {
        self.values.get(&target).copied()
    }

    /// Targets present in this row, in output column order.
    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.values.keys().copied()
    }

    /// `(target, value)` pairs in output column order.
    pub fn iter(&self) -> impl Iterator<Item = (Target, u64)> + '_ {
        self.values.iter().map(|(t, v)| (*t, *v))
    }

    fn add(&mut self, target: Target, value: u64) {
        *self.values.entry(target).or_insert(0) += value;
    }
}

/// Counts, for one block, the source rows within [`CATCHMENT_RADIUS_M`] of
/// the block centroid.
///
/// Only candidates in the block's borough are considered. A candidate whose
/// distance cannot be computed is treated as out of range, and a block whose
/// centroid cannot be computed gets zeros. This function does not fail.
#[must_use]
pub fn aggregate_block(block: &Block, sources: &[SourceSummary]) -> AggregationRow {
    let mut row = AggregationRow::zeroed(sources);

    let Some(origin) = centroid(&block.polygon) else {
        log::trace!("block {} has no centroid, emitting zeros", block.code);
        return row;
    };

    for source in sources {
        let targets = source.kind().targets();

        for candidate in source.candidates(&block.borough) {
            if !distance(origin, candidate.location).within(CATCHMENT_RADIUS_M) {
                continue;
            }
            for (target, value) in targets.iter().zip(&candidate.values) {
                row.add(*target, *value);
            }
        }
    }

    row
}

/// Aggregates the blocks in `range`, in index order.
#[must_use]
pub fn aggregate_range(
    blocks: &[Block],
    sources: &[SourceSummary],
    range: Range<usize>,
    progress: &dyn ProgressCallback,
) -> Vec<AggregationRow> {
    blocks[range]
        .iter()
        .map(|block| {
            let row = aggregate_block(block, sources);
            progress.inc(1);
            row
        })
        .collect()
}
