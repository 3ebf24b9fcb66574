use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::time::sleep;
use tracing::{info, warn};
use tradescout_common::observability::{init_logging, LogConfig};
use tradescout_config::{ScoutConfig, ScoutConfigLoader};
use tradescout_scraper::harvest::{HarvestReport, Harvester, LiveStages};
use tradescout_sink::CsvSink;

/// Harvest device trade-in quotes from the vendor's wizard into a CSV.
#[derive(Parser, Debug)]
#[command(name = "tradescout", version)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "tradescout.yaml")]
    config: PathBuf,

    /// Run the browser headless.
    #[arg(long)]
    headless: bool,

    /// Override the output CSV path.
    #[arg(short, long)]
    output: Option<String>,

    /// Cap the number of models harvested per brand.
    #[arg(short = 'n', long)]
    max_models: Option<usize>,

    /// Override the total number of run attempts.
    #[arg(long)]
    attempts: Option<u32>,

    /// Override the pause between work units, in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,
}

fn load_config(cli: &Cli) -> Result<ScoutConfig> {
    let mut loader = ScoutConfigLoader::new();
    // Environment-only deployments run without a file on disk.
    if cli.config.exists() {
        loader = loader.with_file(&cli.config);
    }
    let mut cfg = loader.load()?;

    if cli.headless {
        cfg.headless = true;
    }
    if let Some(output) = &cli.output {
        cfg.output_path = output.clone();
    }
    if let Some(cap) = cli.max_models {
        cfg.run.max_models_per_brand = Some(cap);
    }
    if let Some(attempts) = cli.attempts {
        cfg.run.attempts = attempts;
    }
    if let Some(delay) = cli.delay_ms {
        cfg.waits.action_delay_ms = delay;
    }
    Ok(cfg)
}

async fn run_once(cfg: &ScoutConfig) -> Result<HarvestReport> {
    let stages = LiveStages::connect(cfg.clone()).await?;
    let mut sink = CsvSink::create(&cfg.output_path)?;
    let mut harvester = Harvester::new(stages, &mut sink, cfg);
    let outcome = harvester.run().await;
    harvester.into_stages().shutdown().await;
    outcome
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    let log_path = init_logging(LogConfig {
        emit_stderr: true,
        ..LogConfig::default()
    })?;
    info!(log = %log_path.display(), output = %cfg.output_path, "starting harvest");

    let attempts = cfg.run.attempts.max(1);
    for attempt in 1..=attempts {
        match run_once(&cfg).await {
            Ok(report) if report.succeeded() => {
                info!(
                    attempt,
                    records = report.records,
                    values = report.values_extracted,
                    recoveries = report.recoveries,
                    "harvest succeeded"
                );
                return Ok(());
            }
            Ok(report) => {
                warn!(attempt, skipped = report.skipped, "run produced no records");
            }
            Err(e) => {
                warn!(attempt, error = %e, "run failed");
            }
        }
        if attempt < attempts {
            info!(delay_secs = cfg.run.retry_delay_secs, "retrying whole run");
            sleep(Duration::from_secs(cfg.run.retry_delay_secs)).await;
        }
    }

    warn!("all attempts exhausted without records");
    std::process::exit(1);
}
