//! Veritrail - Tamper-evident audit ledger with a resilient content-processing pipeline
//!
//! Serves the moderation gateway, replicates audit entries to the remote
//! compliance store in the background, and offers offline chain validation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veritrail::{
    config::VeritrailConfig,
    gateway::{self, GatewayState},
    ledger::LedgerStore,
    pipeline::ModerationPipeline,
    sync::{HttpComplianceRemote, SyncRelay},
};

#[derive(Parser)]
#[command(name = "veritrail")]
#[command(version)]
#[command(about = "Tamper-evident audit ledger with a resilient content-processing pipeline")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VERITRAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the moderation gateway
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the stored hash chain of one stream
    Validate {
        /// Trace ID of the stream to validate
        trace_id: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("veritrail={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        VeritrailConfig::load(config_path)?
    } else {
        VeritrailConfig::default()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_serve(config, host, port).await?;
        }
        Commands::Validate { trace_id } => {
            run_validate(config, &trace_id).await?;
        }
        Commands::Config { default } => {
            let shown = if default {
                VeritrailConfig::default()
            } else {
                config
            };
            println!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}

async fn run_serve(config: VeritrailConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    tracing::info!("Starting Veritrail");

    let ledger = Arc::new(LedgerStore::new(config.ledger.resolved_dir()).await?);

    let (relay, sync_tx) = if config.sync.enabled {
        let remote = Arc::new(HttpComplianceRemote::new(config.sync.endpoint.clone()));
        let relay = Arc::new(SyncRelay::new(ledger.clone(), remote, &config.sync));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        relay.spawn(rx);

        // Periodic retry pass for events that failed under the attempt cap.
        let retry_relay = relay.clone();
        let interval = std::time::Duration::from_secs(config.sync.retry_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let resubmitted = retry_relay.retry_failed_syncs().await;
                if resubmitted > 0 {
                    tracing::info!("Resubmitted {} failed sync(s)", resubmitted);
                }
            }
        });

        (Some(relay), Some(tx))
    } else {
        (None, None)
    };

    // Model runtimes are host-provided; without them the cascade lands on
    // the rule-based tier at startup.
    let pipeline = Arc::new(
        ModerationPipeline::new(&config, ledger, None, None, sync_tx).await?,
    );
    tracing::info!(
        "Active processing tier: {}",
        pipeline.active_method().await
    );

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let state = GatewayState { pipeline, relay };

    tokio::select! {
        result = gateway::serve(state, &host, port) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
        }
    }

    Ok(())
}

async fn run_validate(config: VeritrailConfig, trace_id: &str) -> Result<()> {
    let ledger = LedgerStore::new(config.ledger.resolved_dir()).await?;
    let report = ledger.validate_stream(trace_id).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_valid {
        anyhow::bail!("chain validation failed for stream {}", trace_id);
    }
    Ok(())
}
