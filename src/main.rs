use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use statement_merge::log::init_logging;
use statement_merge::{MergeConfig, Pipeline, Store};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// CSV files or http(s) URLs, merged in this order
    #[arg(required = true)]
    locations: Vec<String>,

    /// Where the unified CSV is written
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with column aliases and currency factors
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also print the result as json, xml or db
    #[arg(short, long)]
    export: Option<String>,

    /// Record the merge run in this SQLite database
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let mut config = match &cli.config {
        Some(path) => MergeConfig::load_from_path(path)?,
        None => MergeConfig::default(),
    };
    if let Some(output) = cli.output {
        config = config.with_output(output);
    }

    let mut pipeline = Pipeline::new(config);

    // Prints the single completion line
    let outcome = pipeline.run(&cli.locations);
    if !outcome.is_success() {
        return Ok(false);
    }

    if let (Some(db_path), Some(unified)) = (&cli.sqlite, pipeline.result()) {
        let mut store = Store::open(db_path)?;
        let run_id = store
            .save_run(unified, &pipeline.config().output_path)
            .context("Failed to record merge run")?;
        println!("✓ Run {} saved to {}", run_id, db_path.display());
    }

    if let Some(format) = &cli.export {
        println!("{}", pipeline.convert_result_to(format));
    }

    Ok(true)
}
