#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for the desirability binary.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, and [`IndicatifProgress`] renders block
//! aggregation progress on the same [`MultiProgress`], so log lines are
//! printed above the bar instead of through it.

use std::sync::Arc;
use std::time::Duration;

use desirability_aggregate::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const BLOCKS_TEMPLATE: &str =
    "  {msg} {wide_bar:.cyan/dim} {human_pos}/{human_len} blocks {per_sec} [{eta}]";

/// Block aggregation progress drawn with `indicatif`.
///
/// Spins until the block total is known, then shows a bar.
pub struct IndicatifProgress {
    bar: ProgressBar,
    blocks_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Adds a block aggregation bar labelled `message` to `multi`.
    #[must_use]
    pub fn blocks_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let blocks_style = ProgressStyle::with_template(BLOCKS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");

        Arc::new(Self { bar, blocks_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.disable_steady_tick();
        self.bar.set_style(self.blocks_style.clone());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger and returns the [`MultiProgress`] that
/// progress bars must be added to.
///
/// Filters come from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
/// A second call keeps the first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let logger = pretty_env_logger::formatted_timed_builder()
        .parse_filters(&filters)
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
