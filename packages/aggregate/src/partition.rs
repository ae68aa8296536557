//! Splits the block list into contiguous index ranges, one per worker.

use std::num::NonZeroUsize;
use std::ops::Range;

/// Divides `[0, num_blocks)` into contiguous ranges of
/// `ceil(num_blocks / num_workers)` blocks, the last one clipped.
///
/// Ranges are returned in order, never overlap, and never leave a gap.
/// Empty ranges are not emitted, so fewer than `num_workers` ranges come
/// back when the blocks run out early.
#[must_use]
pub fn partition(num_blocks: usize, num_workers: NonZeroUsize) -> Vec<Range<usize>> {
    let size = num_blocks.div_ceil(num_workers.get());

    (0..num_workers.get())
        .map(|i| (i * size).min(num_blocks)..((i + 1) * size).min(num_blocks))
        .filter(|range| !range.is_empty())
        .collect()
}
