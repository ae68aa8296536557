#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for the block desirability toolchain.
//!
//! ```text
//! desirability construct --config pipeline.toml [--workers 10] [--output fullData.csv]
//! desirability price-per-zip --modzcta modzcta.csv --out price_per_zip.csv <SALES>...
//! desirability model-frame --full-data fullData.csv --prices price_per_zip.csv --out frame.csv
//! desirability partitions --blocks 37000 --workers 10
//! ```
//!
//! Uses `indicatif-log-bridge` (via [`desirability_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod pipeline;

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use desirability_cli_utils::MultiProgress;
use desirability_dataset::model_frame::{PREDICTORS, predictor_correlations};
use pipeline::PipelineError;

#[derive(Parser)]
#[command(
    name = "desirability",
    about = "Per-block desirability features for New York City census blocks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the per-block dataset from a pipeline config
    Construct {
        /// Pipeline TOML naming the block and source inputs
        #[arg(long)]
        config: PathBuf,
        /// Number of aggregation workers (overrides the config)
        #[arg(long, env = "DESIRABILITY_WORKERS")]
        workers: Option<usize>,
        /// Output CSV path (overrides the config)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compute mean price per square foot by modified ZCTA from rolling sales
    PricePerZip {
        /// Modified ZCTA table with modzcta, label and zcta columns
        #[arg(long)]
        modzcta: PathBuf,
        /// Output CSV path
        #[arg(long, default_value = "price_per_zip.csv")]
        out: PathBuf,
        /// Preamble lines to skip before each sales header row
        #[arg(long, default_value = "0")]
        skip_rows: usize,
        /// Rolling sales CSV files
        #[arg(required = true)]
        sales: Vec<PathBuf>,
    },
    /// Join the block dataset with price-per-zip into an area-normalized frame
    ModelFrame {
        /// Per-block dataset written by `construct`
        #[arg(long)]
        full_data: PathBuf,
        /// Price table written by `price-per-zip`
        #[arg(long)]
        prices: PathBuf,
        /// Output CSV path
        #[arg(long, default_value = "model_frame.csv")]
        out: PathBuf,
    },
    /// Print how blocks would be partitioned across workers
    Partitions {
        /// Number of blocks
        #[arg(long)]
        blocks: usize,
        /// Number of workers
        #[arg(long, default_value = "10")]
        workers: NonZeroUsize,
    },
}

fn run(command: Commands, multi: &MultiProgress) -> Result<(), PipelineError> {
    match command {
        Commands::Construct {
            config,
            workers,
            output,
        } => pipeline::construct_from_file(&config, workers, output, multi)?,
        Commands::PricePerZip {
            modzcta,
            out,
            skip_rows,
            sales,
        } => pipeline::price_table(&modzcta, &sales, skip_rows, &out)?,
        Commands::ModelFrame {
            full_data,
            prices,
            out,
        } => {
            let rows = pipeline::model_frame(&full_data, &prices, &out)?;

            let matrix = predictor_correlations(&rows);
            for (name, row) in PREDICTORS.iter().zip(&matrix) {
                let cells: Vec<String> = row.iter().map(|r| format!("{r:>7.3}")).collect();
                log::info!("{name:>15} {}", cells.join(" "));
            }
        }
        Commands::Partitions { blocks, workers } => {
            let ranges = desirability_aggregate::partition(blocks, workers);
            println!("{blocks} blocks across {} partitions", ranges.len());
            for (i, range) in ranges.iter().enumerate() {
                println!("{i:>4}: {:>8}..{:<8} ({} blocks)", range.start, range.end, range.len());
            }
        }
    }

    Ok(())
}

fn main() {
    let multi = desirability_cli_utils::init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli.command, &multi) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
