//! Fans block partitions out to a fixed-size worker pool and concatenates
//! the results in block order.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use desirability_geography_models::Block;
use desirability_source_models::Target;
use rayon::prelude::*;

use crate::AggregateError;
use crate::aggregator::{AggregationRow, aggregate_range};
use crate::partition::partition;
use crate::preprocess::SourceSummary;
use crate::progress::ProgressCallback;

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 10;

/// Per-block aggregation output, one row per block in block order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationTable {
    targets: Vec<Target>,
    rows: Vec<AggregationRow>,
}

impl AggregationTable {
    /// An empty table whose columns are the targets declared by `sources`.
    #[must_use]
    pub fn new(sources: &[SourceSummary]) -> Self {
        Self {
            targets: AggregationRow::zeroed(sources).targets().collect(),
            rows: Vec::new(),
        }
    }

    /// Target columns, in output order.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Rows, in block order.
    #[must_use]
    pub fn rows(&self) -> &[AggregationRow] {
        &self.rows
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

    /// Appends a partition's rows.
    pub fn extend(&mut self, rows: Vec<AggregationRow>) {
        self.rows.extend(rows);
    }
}

/// Aggregates every block on the calling thread.
#[must_use]
pub fn run_sequential(
    blocks: &[Block],
    sources: &[SourceSummary],
    progress: &Arc<dyn ProgressCallback>,
) -> AggregationTable {
    let mut table = AggregationTable::new(sources);
    table.extend(aggregate_range(
        blocks,
        sources,
        0..blocks.len(),
        progress.as_ref(),
    ));
    table
}

/// Aggregates every block across `workers` threads.
///
/// Blocks are split into contiguous partitions, each handled start to
/// finish by one worker in index order. Partition results are concatenated
/// in partition order, so rows come back in the same order as `blocks`.
/// `blocks` and `sources` are shared read-only with every worker.
///
/// # Errors
///
/// * [`AggregateError::InvalidWorkerCount`] if `workers` is zero
/// * [`AggregateError::ThreadPool`] if the worker pool cannot be built
/// * [`AggregateError::WorkerPanicked`] if any partition panics; no partial
///   table is returned
pub fn run_all(
    blocks: &[Block],
    sources: &[SourceSummary],
    workers: usize,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<AggregationTable, AggregateError> {
    let workers = NonZeroUsize::new(workers).ok_or(AggregateError::InvalidWorkerCount)?;
    let ranges = partition(blocks.len(), workers);

    log::info!(
        "Aggregating {} blocks across {} partitions on {workers} workers",
        blocks.len(),
        ranges.len()
    );
    for (i, range) in ranges.iter().enumerate() {
        log::debug!("partition {i}: blocks {range:?}");
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.get())
        .thread_name(|i| format!("aggregate-{i}"))
        .build()?;

    progress.set_total(blocks.len() as u64);
    let start = Instant::now();

    let results: Vec<std::thread::Result<Vec<AggregationRow>>> = pool.install(|| {
        ranges
            .par_iter()
            .with_max_len(1)
            .map(|range| {
                panic::catch_unwind(AssertUnwindSafe(|| {
                    aggregate_range(blocks, sources, range.clone(), progress.as_ref())
                }))
            })
            .collect()
    });

    let mut table = AggregationTable::new(sources);
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(rows) => table.extend(rows),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("partition {i} failed: {message}");
                return Err(AggregateError::WorkerPanicked {
                    partition: i,
                    message,
                });
            }
        }
    }

    progress.finish(format!("Aggregated {} blocks", table.len()));
    log::info!(
        "Aggregated {} blocks in {:.1}s",
        table.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(table)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use desirability_source_models::{PointDetail, SourceDataset, SourceKind, SourcePoint};
    use geo::{LineString, MultiPolygon, Polygon};

    use super::*;
    use crate::preprocess::aggregate_exact;
    use crate::progress::{CountingProgress, null_progress};

    fn grid_block(i: usize) -> Block {
        let lat = 40.60 + (i / 20) as f64 * 0.004;
        let lon = -73.95 + (i % 20) as f64 * 0.004;
        let ring = LineString::from(vec![
            (lon, lat),
            (lon + 0.004, lat),
            (lon + 0.004, lat + 0.004),
            (lon, lat + 0.004),
            (lon, lat),
        ]);
        Block {
            code: format!("{i:07}"),
            geoid: i64::try_from(i).unwrap(),
            borough: if i % 3 == 0 { "Queens" } else { "Brooklyn" }.to_string(),
            area: 1.0,
            polygon: MultiPolygon(vec![Polygon::new(ring, vec![])]),
            modzcta: None,
            perc_no_internet: None,
        }
    }

    fn fixture() -> (Vec<Block>, Vec<SourceSummary>) {
        let blocks: Vec<Block> = (0..137).map(grid_block).collect();
        let points: Vec<SourcePoint> = (0..60u64)
            .map(|id| SourcePoint {
                id,
                latitude: 40.601 + (id % 7) as f64 * 0.01,
                longitude: -73.949 + (id % 11) as f64 * 0.007,
                detail: PointDetail::Crime { violent: id % 4 == 0 },
            })
            .collect();
        let groceries: Vec<SourcePoint> = (0..25u64)
            .map(|id| SourcePoint {
                id,
                latitude: 40.602 + (id % 5) as f64 * 0.012,
                longitude: -73.948 + (id % 9) as f64 * 0.008,
                detail: PointDetail::Grocery,
            })
            .collect();

        let index = desirability_spatial::BlockIndex::build(&blocks);
        let locate = |p: &SourcePoint| index.locate(p.latitude, p.longitude);
        let sources = vec![
            aggregate_exact(
                &SourceDataset::new(SourceKind::Crime, points),
                &blocks,
                locate,
            ),
            aggregate_exact(
                &SourceDataset::new(SourceKind::Grocery, groceries),
                &blocks,
                locate,
            ),
        ];
        (blocks, sources)
    }

    #[test]
    fn parallel_matches_sequential_order() {
        let (blocks, sources) = fixture();
        let expected = run_sequential(&blocks, &sources, &null_progress());
        assert!(expected.rows().iter().any(|r| r.get(Target::NumCrime) > Some(0)));

        for workers in [1, 2, 3, 10, 200] {
            let table = run_all(&blocks, &sources, workers, &null_progress()).unwrap();
            assert_eq!(table, expected, "mismatch with {workers} workers");
        }
    }

    #[test]
    fn table_columns_follow_declared_targets() {
        let (blocks, sources) = fixture();
        let table = run_all(&blocks, &sources, 4, &null_progress()).unwrap();
        assert_eq!(
            table.targets(),
            &[Target::NumCrime, Target::NumViolent, Target::NumGrocery]
        );
        assert_eq!(table.len(), blocks.len());
    }

    #[test]
    fn every_block_reports_progress() {
        let (blocks, sources) = fixture();
        let counter = Arc::new(CountingProgress::default());
        let progress: Arc<dyn ProgressCallback> = counter.clone();

        run_all(&blocks, &sources, 6, &progress).unwrap();

        assert_eq!(counter.total(), blocks.len() as u64);
        assert_eq!(counter.done(), blocks.len() as u64);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let (blocks, sources) = fixture();
        let err = run_all(&blocks, &sources, 0, &null_progress()).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidWorkerCount));
    }

    #[test]
    fn empty_block_list_yields_empty_table() {
        let table = run_all(&[], &[], 3, &null_progress()).unwrap();
        assert!(table.is_empty());
    }

    struct PanicAfter(std::sync::atomic::AtomicU64, u64);

    impl ProgressCallback for PanicAfter {
        fn set_total(&self, _total: u64) {}
        fn inc(&self, delta: u64) {
            let seen = self
                .0
                .fetch_add(delta, std::sync::atomic::Ordering::SeqCst);
            assert!(seen < self.1, "worker failure injected");
        }
        fn finish(&self, _msg: String) {}
    }

    #[test]
    fn worker_panic_fails_the_run() {
        let (blocks, sources) = fixture();
        let progress: Arc<dyn ProgressCallback> =
            Arc::new(PanicAfter(std::sync::atomic::AtomicU64::new(0), 50));
        let err = run_all(&blocks, &sources, 4, &progress).unwrap_err();
        match err {
            AggregateError::WorkerPanicked { message, .. } => {
                assert!(message.contains("worker failure injected"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn counts_are_never_negative_and_bounded_by_sources() {
        let (blocks, sources) = fixture();
        let table = run_sequential(&blocks, &sources, &null_progress());
        let total_crime: u64 = sources[0].rows().map(|r| r.values[0]).sum();
        for row in table.rows() {
            let crime = row.get(Target::NumCrime).unwrap();
            let violent = row.get(Target::NumViolent).unwrap();
            assert!(violent <= crime);
            assert!(crime <= total_crime);
        }
    }
}
