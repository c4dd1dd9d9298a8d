//! sensord — the SensorGrid exporter daemon.
//!
//! Single binary that assembles:
//! - Config loading (sensord.toml)
//! - Metric registry
//! - Configured producers
//! - Exporter loop (stdout or textfile)
//!
//! # Usage
//!
//! ```text
//! sensord run --config /etc/sensord.toml
//! sensord collect --config /etc/sensord.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use sensorgrid_core::SensordConfig;
use sensorgrid_metrics::{MetricRegistry, unix_millis};

mod exporter;
mod logging;

use exporter::{Exporter, Sink};

#[derive(Parser)]
#[command(name = "sensord", about = "SensorGrid exporter daemon", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect on an interval and publish every document until Ctrl-C.
    Run {
        /// Path to sensord.toml.
        #[arg(short, long, default_value = "/etc/sensord.toml")]
        config: PathBuf,
    },
    /// Collect once and print the document to stdout.
    Collect {
        /// Path to sensord.toml.
        #[arg(short, long, default_value = "/etc/sensord.toml")]
        config: PathBuf,
    },
    /// Parse and validate a config file, including its producers.
    CheckConfig {
        /// Path to sensord.toml.
        #[arg(short, long, default_value = "/etc/sensord.toml")]
        config: PathBuf,
    },
    /// Print a starter config.
    Init {
        /// Value for the `site` tag of the info metric.
        #[arg(long, default_value = "default")]
        site: String,
    },
    /// List the built-in producer kinds.
    Producers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Collect { config } => collect(&config).await,
        Command::CheckConfig { config } => check_config(&config),
        Command::Init { site } => {
            print!("{}", SensordConfig::scaffold(&site).to_toml_string()?);
            Ok(())
        }
        Command::Producers => {
            for descriptor in sensorgrid_producers::PRODUCERS {
                println!("{:<10} {}", descriptor.kind, descriptor.description);
            }
            Ok(())
        }
    }
}

fn load(path: &Path) -> anyhow::Result<SensordConfig> {
    SensordConfig::from_file(path).with_context(|| format!("invalid config {}", path.display()))
}

fn build_registry(config: &SensordConfig) -> anyhow::Result<MetricRegistry> {
    let registry = MetricRegistry::new();
    sensorgrid_producers::install_all(&registry, &config.producers)?;
    Ok(registry)
}

async fn run(path: &Path) -> anyhow::Result<()> {
    let config = load(path)?;
    logging::init(&config.logging)?;
    info!(config = %path.display(), "sensord starting");

    // ── Initialize subsystems ──────────────────────────────────

    let registry = build_registry(&config)?;
    info!(
        producers = config.producers.len(),
        metrics = registry.metric_count(),
        "producers installed"
    );

    let exporter = Exporter::new(
        registry,
        Sink::from_output(config.exporter.output_path()),
        config.exporter.interval()?,
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let exporter_handle = tokio::spawn(async move {
        exporter.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install CTRL+C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = exporter_handle.await;
    info!("sensord stopped");
    Ok(())
}

async fn collect(path: &Path) -> anyhow::Result<()> {
    let config = load(path)?;
    logging::init(&config.logging)?;

    let registry = build_registry(&config)?;
    let document = registry.render(unix_millis()).await?;
    print!("{document}");
    Ok(())
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = load(path)?;
    let registry = build_registry(&config)?;

    println!(
        "{}: ok ({} producers, {} metrics, interval {:?}, output {})",
        path.display(),
        config.producers.len(),
        registry.metric_count(),
        config.exporter.interval()?,
        config.exporter.output,
    );
    Ok(())
}
