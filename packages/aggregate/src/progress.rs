//! Block progress reporting.
//!
//! Aggregation workers report each finished block through a shared
//! [`ProgressCallback`]. The terminal implementation lives in
//! `desirability_cli_utils`; this module only carries the silent and
//! counting implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives block progress from aggregation workers.
///
/// Called concurrently from every worker thread.
pub trait ProgressCallback: Send + Sync {
    /// Number of blocks the run will aggregate.
    fn set_total(&self, total: u64);

    /// `delta` more blocks are done.
    fn inc(&self, delta: u64);

    /// The run finished.
    fn finish(&self, msg: String);
}

/// Ignores all progress.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Tallies reported progress without rendering it.
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicU64,
    done: AtomicU64,
}

impl CountingProgress {
    /// Total announced by the last [`ProgressCallback::set_total`] call.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Blocks reported done so far.
    #[must_use]
    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }
}

impl ProgressCallback for CountingProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
    }

    fn inc(&self, delta: u64) {
        self.done.fetch_add(delta, Ordering::Relaxed);
    }

    fn finish(&self, msg: String) {
        log::debug!("{msg} ({}/{} blocks)", self.done(), self.total());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_progress_resets_on_new_total() {
        let progress = CountingProgress::default();
        progress.set_total(5);
        progress.inc(2);
        progress.inc(3);
        assert_eq!(progress.done(), 5);

        progress.set_total(7);
        assert_eq!(progress.total(), 7);
        assert_eq!(progress.done(), 0);
    }
}
