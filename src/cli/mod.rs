//! Command-line interface for the churn workflow
//!
//! The four subcommands mirror the pipeline stages: preprocess raw data into
//! model-ready tables, sweep the model grid, evaluate and promote the best
//! candidate, and serve the promoted model.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::data::{load_table, write_parquet, DatasetSource};
use crate::preprocessing::{sample_fraction, ChurnPreprocessor};
use crate::registry::ModelRegistry;
use crate::server::{run_server, ServeConfig};
use crate::tracking::ExperimentTracker;
use crate::training::{
    candidates_from_runs, design_matrix, evaluate_candidates, run_experiment, train_val_split,
    TrainOptions,
};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "telco-churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer churn prediction pipeline")]
#[command(long_about = None)]
pub struct Cli {
    /// Params file (JSON); missing file falls back to defaults
    #[arg(short, long, default_value = "params.json", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preprocess raw data into model-ready tables
    Preprocess {
        /// Raw dataset path inside the data root (CSV or Parquet)
        #[arg(short, long, default_value = "raw/telco_churn.csv")]
        data: String,

        /// Dataset revision to fetch
        #[arg(short, long)]
        revision: Option<String>,

        /// Output directory for the processed tables
        #[arg(short, long, default_value = "data/processed")]
        output: PathBuf,
    },

    /// Sweep the model grid over a processed dataset
    Train {
        /// Processed dataset (Parquet), defaults to the configured data path
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Re-score tracked runs and promote the best model
    Evaluate {
        /// Processed dataset (Parquet), defaults to the configured data path
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Serve the promoted model over HTTP
    Serve {
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host
        #[arg(long)]
        host: Option<String>,
    },
}

fn processed_path(config: &PipelineConfig, data: Option<PathBuf>) -> PathBuf {
    data.unwrap_or_else(|| {
        DatasetSource::new(&config.data_root).resolve(&config.data_path, &config.data_revision)
    })
}

fn train_options(config: &PipelineConfig) -> TrainOptions {
    TrainOptions {
        validation_split: config.validation_split,
        random_seed: config.random_seed,
        c_grid: config.c_grid.clone(),
        n_estimators_grid: config.n_estimators_grid.clone(),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_preprocess(
    config: &PipelineConfig,
    data: &str,
    revision: Option<&str>,
    output: &Path,
) -> anyhow::Result<()> {
    section("Preprocess");

    let revision = revision.unwrap_or(&config.data_revision);
    let source = DatasetSource::new(&config.data_root);

    step_run(&format!("Fetching {} @ {}", data.cyan(), revision));
    let start = Instant::now();
    let df = source.fetch(data, revision)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        df.height(),
        df.width(),
        start.elapsed()
    ));

    step_run("Preprocessing");
    let start = Instant::now();
    let mut preprocessor = ChurnPreprocessor::new();
    let mut output_set = preprocessor.preprocess(&df)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        output_set.encoded.height(),
        output_set.encoded.width(),
        start.elapsed()
    ));

    let full_path = output.join("full.parquet");
    step_run(&format!("Saving → {}", full_path.display()));
    write_parquet(&mut output_set.encoded, &full_path)?;
    step_done("");

    let mut reduced = sample_fraction(
        &output_set.encoded,
        config.reduced_fraction,
        config.random_seed,
    )?;
    let reduced_path = output.join("reduced.parquet");
    step_run(&format!("Saving reduced sample → {}", reduced_path.display()));
    write_parquet(&mut reduced, &reduced_path)?;
    step_done(&format!("{} rows", reduced.height()));

    let schema_path = output.join("schema.json");
    step_run(&format!("Saving schema → {}", schema_path.display()));
    std::fs::write(
        &schema_path,
        serde_json::to_string_pretty(&output_set.schema)?,
    )?;
    step_done(&format!("{} columns", output_set.schema.len()));

    println!();
    Ok(())
}

pub fn cmd_train(config: &PipelineConfig, data: Option<PathBuf>) -> anyhow::Result<()> {
    section("Train");

    let path = processed_path(config, data);
    step_run(&format!("Loading {}", path.display()));
    let start = Instant::now();
    let df = load_table(&path)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        df.height(),
        df.width(),
        start.elapsed()
    ));

    let (x, y, _features) = design_matrix(&df, "customerID", "Churn")?;

    let mut tracker = ExperimentTracker::new(&config.tracking_dir, &config.experiment_name)?;
    let registry = ModelRegistry::new(&config.registry_dir)?;
    let options = train_options(config);

    step_run(&format!(
        "Sweeping {} configurations",
        options.c_grid.len() + options.n_estimators_grid.len()
    ));
    let start = Instant::now();
    let candidates = run_experiment(&x, &y, &options, &mut tracker, &registry)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    for candidate in &candidates {
        println!(
            "  {:<28} {}  {}",
            muted(&candidate.config.name()),
            format!("acc {:.4}", candidate.metrics.accuracy).white(),
            format!("f1 {:.4}", candidate.metrics.f1_score).white().bold(),
        );
    }
    println!();

    Ok(())
}

pub fn cmd_evaluate(config: &PipelineConfig, data: Option<PathBuf>) -> anyhow::Result<()> {
    section("Evaluate");

    let path = processed_path(config, data);
    step_run(&format!("Loading {}", path.display()));
    let df = load_table(&path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let (x, y, _features) = design_matrix(&df, "customerID", "Churn")?;
    // Same seed as training, so the evaluation split matches
    let (_, x_val, _, y_val) =
        train_val_split(&x, &y, config.validation_split, config.random_seed)?;

    let mut tracker = ExperimentTracker::new(&config.tracking_dir, &config.experiment_name)?;
    let registry = ModelRegistry::new(&config.registry_dir)?;
    let candidates = candidates_from_runs(tracker.runs());

    step_run(&format!("Re-scoring {} candidates", candidates.len()));
    let start = Instant::now();
    let result = evaluate_candidates(&candidates, &x_val, &y_val, &mut tracker, &registry)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!(
        "  {:<16} {}",
        muted("Best model"),
        result.best.config.name().white().bold()
    );
    println!(
        "  {:<16} {}",
        muted("F1"),
        format!("{:.4}", result.best.metrics.f1_score).white()
    );
    if let Some(auc) = result.best.metrics.auc {
        println!("  {:<16} {}", muted("AUC"), format!("{:.4}", auc).white());
    }
    println!(
        "  {:<16} {}",
        muted("Promoted as"),
        result.promoted_alias.cyan()
    );
    println!();

    println!("  {}", muted("Registered models"));
    for meta in registry.list()? {
        let marker = if meta.model_id == result.best.model_id {
            "*"
        } else {
            " "
        };
        println!("  {} {:<10} {}", marker, meta.model_id.cyan(), meta.name.white());
    }
    println!();

    Ok(())
}

pub async fn cmd_serve(
    config: &PipelineConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let serve_config = ServeConfig {
        host: host.unwrap_or_else(|| config.host.clone()),
        port: port.unwrap_or(config.port),
        registry_dir: PathBuf::from(&config.registry_dir),
    };
    run_server(serve_config).await
}
