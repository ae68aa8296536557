//! Subcommand pipelines.
//!
//! Block dataset construction chains load -> join -> aggregate -> write.
//! Every subcommand wraps each stage's failure in [`PipelineError`] so the
//! diagnostic names the stage that failed.

use std::path::{Path, PathBuf};
use std::time::Instant;

use desirability_aggregate::{AggregateError, SourceSummary, aggregate_exact, run_all};
use desirability_cli_utils::{IndicatifProgress, MultiProgress};
use desirability_dataset::DatasetError;
use desirability_dataset::blocks::{
    join_internet, join_zip_lookup, load_blocks, load_internet, load_zip_lookup,
};
use desirability_dataset::config::PipelineConfig;
use desirability_dataset::model_frame::{ModelRow, build_model_frame, write_model_frame};
use desirability_dataset::modzcta::ModZctaTable;
use desirability_dataset::output::write_full_data;
use desirability_dataset::price::{price_per_zip, read_prices, write_prices};
use desirability_dataset::sources::load_source;
use desirability_geography_models::Block;
use desirability_spatial::BlockIndex;
use thiserror::Error;

/// A failed construction stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The config or an input table could not be loaded.
    #[error("Load stage failed: {0}")]
    Load(#[source] DatasetError),

    /// A zip-level lookup table could not be loaded.
    #[error("Join stage failed: {0}")]
    Join(#[source] DatasetError),

    /// Aggregation failed.
    #[error("Aggregate stage failed: {0}")]
    Aggregate(#[from] AggregateError),

    /// The output table could not be written.
    #[error("Write stage failed: {0}")]
    Write(#[source] DatasetError),
}

fn load_joined_blocks(config: &PipelineConfig) -> Result<Vec<Block>, PipelineError> {
    let blocks = load_blocks(&config.blocks.geojson).map_err(PipelineError::Load)?;
    let lookup = load_zip_lookup(&config.blocks.zip_lookup).map_err(PipelineError::Join)?;
    let internet = load_internet(&config.blocks.internet).map_err(PipelineError::Join)?;

    let blocks = join_zip_lookup(blocks, &lookup);
    let blocks = join_internet(blocks, &internet);
    log::info!("{} blocks remain after zip and internet joins", blocks.len());
    Ok(blocks)
}

fn summarize_sources(
    config: &PipelineConfig,
    blocks: &[Block],
) -> Result<Vec<SourceSummary>, PipelineError> {
    let index = BlockIndex::build(blocks);
    let mut summaries = Vec::new();

    for (kind, path) in config.sources.configured() {
        let dataset = load_source(kind, path).map_err(PipelineError::Load)?;
        summaries.push(aggregate_exact(&dataset, blocks, |p| {
            index.locate(p.latitude, p.longitude)
        }));
    }

    Ok(summaries)
}

/// Builds the per-block dataset described by `config` and writes it to
/// `output`.
///
/// # Errors
///
/// Returns the [`PipelineError`] of the first stage that fails. Nothing is
/// written unless every stage succeeds.
pub fn construct(
    config: &PipelineConfig,
    workers: usize,
    output: &Path,
    multi: &MultiProgress,
) -> Result<(), PipelineError> {
    let start = Instant::now();

    let blocks = load_joined_blocks(config)?;
    let sources = summarize_sources(config, &blocks)?;

    let progress = IndicatifProgress::blocks_bar(multi, "Aggregating blocks");
    let table = run_all(&blocks, &sources, workers, &progress)?;

    write_full_data(output, &blocks, &table).map_err(PipelineError::Write)?;

    log::info!(
        "Constructed {} block rows in {:.1}s",
        table.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Loads the pipeline config at `config_path` and runs [`construct`].
///
/// `workers` and `output` override the config's run settings.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if the config cannot be read or parsed,
/// or the error of the first failing construction stage.
pub fn construct_from_file(
    config_path: &Path,
    workers: Option<usize>,
    output: Option<PathBuf>,
    multi: &MultiProgress,
) -> Result<(), PipelineError> {
    let config = PipelineConfig::load(config_path).map_err(PipelineError::Load)?;
    let workers = workers.unwrap_or(config.run.workers);
    let output = output.unwrap_or_else(|| config.run.output.clone());
    construct(&config, workers, &output, multi)
}

/// Summarizes rolling-sales files into the price-per-zip table at `out`.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if the `ModZCTA` table or a sales file
/// cannot be read, or [`PipelineError::Write`] if the table cannot be
/// written.
pub fn price_table(
    modzcta: &Path,
    sales: &[PathBuf],
    skip_rows: usize,
    out: &Path,
) -> Result<(), PipelineError> {
    let table = ModZctaTable::load(modzcta).map_err(PipelineError::Load)?;
    let rows = price_per_zip(sales, skip_rows, &table).map_err(PipelineError::Load)?;
    write_prices(out, &rows).map_err(PipelineError::Write)
}

/// Builds the model frame from the per-block table and price table and
/// writes it to `out`.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if either input cannot be read, or
/// [`PipelineError::Write`] if the frame cannot be written.
pub fn model_frame(
    full_data: &Path,
    prices: &Path,
    out: &Path,
) -> Result<Vec<ModelRow>, PipelineError> {
    let prices = read_prices(prices).map_err(PipelineError::Load)?;
    let rows = build_model_frame(full_data, &prices).map_err(PipelineError::Load)?;
    write_model_frame(out, &rows).map_err(PipelineError::Write)?;
    Ok(rows)
}
