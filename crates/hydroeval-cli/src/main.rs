//! hydroeval: batch post-processing over a calibration results directory.
//!
//! Usage:
//!   hydroeval summarize-params --result-dir runs/exp1 --model xaj
//!   hydroeval renormalize-params --result-dir runs/exp1 --model xaj
//!   hydroeval summarize-metrics --result-dir runs/exp1

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use hydroeval_core::denormalize;
use hydroeval_core::metrics;
use hydroeval_core::model_config;
use hydroeval_core::store::ParameterStore;
use hydroeval_core::BasinId;

#[derive(Parser)]
#[command(name = "hydroeval", about = "Aggregate per-basin calibration results")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consolidate stored normalized parameter vectors into one table.
    SummarizeParams {
        #[arg(long)]
        result_dir: PathBuf,
        /// Model whose declared parameter order labels the rows.
        #[arg(long)]
        model: String,
        /// Comma-separated basin ids; defaults to sorted discovery.
        #[arg(long)]
        basins: Option<String>,
    },
    /// Map stored vectors to physical units and consolidate them.
    RenormalizeParams {
        #[arg(long)]
        result_dir: PathBuf,
        #[arg(long)]
        model: String,
        #[arg(long)]
        basins: Option<String>,
    },
    /// Aggregate per-basin train/test metrics into two wide tables.
    SummarizeMetrics {
        #[arg(long)]
        result_dir: PathBuf,
        #[arg(long)]
        basins: Option<String>,
    },
}

fn resolve_basins(result_dir: &std::path::Path, basins: Option<String>) -> Result<Vec<BasinId>> {
    match basins {
        Some(list) => Ok(list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(BasinId::new)
            .collect()),
        None => {
            let basins = metrics::discover_basins(result_dir)?;
            log::info!("discovered {} basin directories", basins.len());
            Ok(basins)
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::SummarizeParams {
            result_dir,
            model,
            basins,
        } => {
            let basins = resolve_basins(&result_dir, basins)?;
            let spec = model_config::model_spec(&model)?;
            let store = ParameterStore::new(&result_dir);
            let table = store.summarize(&basins, spec)?;
            println!(
                "wrote {} ({} parameters x {} basins)",
                result_dir.join(hydroeval_core::store::PARAMS_SUMMARY_FILE).display(),
                table.n_rows(),
                table.n_columns()
            );
        }
        Command::RenormalizeParams {
            result_dir,
            model,
            basins,
        } => {
            let basins = resolve_basins(&result_dir, basins)?;
            let spec = model_config::model_spec(&model)?;
            let store = ParameterStore::new(&result_dir);
            let table = denormalize::denormalize_all(&store, &basins, spec)?;
            println!(
                "wrote {} ({} parameters x {} basins)",
                result_dir
                    .join(denormalize::RENORMALIZED_SUMMARY_FILE)
                    .display(),
                table.n_rows(),
                table.n_columns()
            );
        }
        Command::SummarizeMetrics { result_dir, basins } => {
            let basins = resolve_basins(&result_dir, basins)?;
            let (train, test) = metrics::aggregate(&result_dir, &basins)?;
            train.write_csv(&result_dir.join(metrics::METRICS_SUMMARY_TRAIN_FILE))?;
            test.write_csv(&result_dir.join(metrics::METRICS_SUMMARY_TEST_FILE))?;
            println!(
                "wrote {} and {} ({} metrics x {} basins)",
                result_dir.join(metrics::METRICS_SUMMARY_TRAIN_FILE).display(),
                result_dir.join(metrics::METRICS_SUMMARY_TEST_FILE).display(),
                train.n_rows(),
                train.n_columns()
            );
        }
    }

    Ok(())
}
