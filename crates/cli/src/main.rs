//! `stockroute <input.json>`: run the full pipeline and print the report.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use stockroute_infra::{EngineConfig, PipelineInput, run_pipeline};

#[derive(Debug, Parser)]
#[command(name = "stockroute", version, about = "Inventory EOQ and distribution planning")]
struct Cli {
    /// Pipeline input: `{ rows, capacities, demands?, routes }`.
    input: PathBuf,

    /// Engine configuration (JSON); missing fields take their defaults.
    #[arg(long, env = "STOCKROUTE_CONFIG")]
    config: Option<PathBuf>,

    /// Print the report on a single line.
    #[arg(long)]
    compact: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            EngineConfig::from_json_str(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate().context("invalid configuration after environment overrides")?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    stockroute_observability::init();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let raw = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input {}", cli.input.display()))?;
    let input = PipelineInput::from_json_str(&raw)
        .with_context(|| format!("malformed input {}", cli.input.display()))?;

    tracing::info!(input = %cli.input.display(), rows = input.rows.len(), "starting pipeline");
    let output = run_pipeline(input, config).context("pipeline failed")?;

    let json = if cli.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{json}");
    Ok(())
}
