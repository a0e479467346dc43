use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use arc_swap::ArcSwap;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ivr_flow_engine::config::RuntimeConfig;
use ivr_flow_engine::flow::agent::AgentRoster;
use ivr_flow_engine::flow::registry::ConfigRegistry;
use ivr_flow_engine::flow::{run_call, DriverOutcome};
use ivr_flow_engine::provider::loopback::LoopbackProvider;

/// IVR call-flow engine
#[derive(Parser, Debug)]
#[command(name = "ivr-engine")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding ivrconfig.json, automax_webAPIConfig.json, and the
    /// optional agent_extensions.json / recording_profiles.json
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the flow and API catalog, then exit. Useful for CI
    /// gating on Invariant 1 / Invariant 2 without starting the provider loop.
    Validate,

    /// Accept calls and run them through the flow driver. Call ids are read
    /// one per line from stdin — the line `RELOAD` swaps in a freshly loaded
    /// registry before the next call (Invariant 5: config is immutable for
    /// the lifetime of any call already in flight).
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let runtime_config = RuntimeConfig::from_env(cli.config_dir.clone()).map_err(|e| anyhow!(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&runtime_config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Commands::Validate => {
            ConfigRegistry::load(&runtime_config.config_dir).map_err(|e| anyhow!(e.to_string()))?;
            println!("configuration in {} is valid", runtime_config.config_dir.display());
            Ok(())
        }
        Commands::Serve => serve(runtime_config).await,
    }
}

async fn serve(runtime_config: RuntimeConfig) -> anyhow::Result<()> {
    let registry = ConfigRegistry::load(&runtime_config.config_dir).map_err(|e| anyhow!(e.to_string()))?;
    let registry = Arc::new(ArcSwap::from_pointee(registry));

    let provider: Arc<dyn ivr_flow_engine::CallProvider> = Arc::new(LoopbackProvider);
    let roster = Arc::new(AgentRoster::new());
    let http_client = reqwest::Client::builder()
        .timeout(runtime_config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;

    info!(config_dir = %runtime_config.config_dir.display(), "IVR engine ready, reading call ids from stdin");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await.context("reading call id from stdin")? {
        let call_id = line.trim();
        if call_id.is_empty() {
            continue;
        }

        if call_id.eq_ignore_ascii_case("RELOAD") {
            match ConfigRegistry::load(&runtime_config.config_dir) {
                Ok(fresh) => {
                    registry.store(Arc::new(fresh));
                    info!("configuration reloaded");
                }
                Err(e) => warn!(error = %e, "configuration reload failed, keeping previous registry"),
            }
            continue;
        }

        let call_id = call_id.to_string();
        let registry = registry.load_full();
        let provider = provider.clone();
        let http_client = http_client.clone();
        let roster = roster.clone();
        let loop_protection_threshold = runtime_config.loop_protection_threshold;

        // One task per call: a handler panic unwinds only this task, not the
        // accept loop or any other concurrent call (§5 Scheduling model).
        let handle = tokio::spawn(run_call(
            call_id.clone(),
            registry,
            provider,
            http_client,
            roster,
            loop_protection_threshold,
        ));

        tokio::spawn(async move {
            match handle.await {
                Ok(DriverOutcome::Completed) => info!(call_id, "call completed"),
                Ok(DriverOutcome::DeadEnd { node_id, token }) => {
                    error!(call_id, node_id, token, "call hit a dead end")
                }
                Ok(DriverOutcome::Fatal(e)) => error!(call_id, error = %e, "call ended with a fatal error"),
                Err(join_err) if join_err.is_panic() => {
                    error!(call_id, "call handler panicked; isolated to this call");
                }
                Err(join_err) => warn!(call_id, error = %join_err, "call task did not complete"),
            }
        });
    }

    Ok(())
}
