//! Etherlight Daemon
//!
//! Main entry point for etherlightd. Loads the configuration, plays the
//! boot animation and runs the poller and compositor until interrupted.

use anyhow::Context;
use clap::{Parser, Subcommand};
use etherlightd::{rainbow_cycle, AppContext, ColorOrder, EtherlightConfig, MemoryStrip};
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG_PATH: &str = "/etc/etherlight/config.toml";

/// Switch port status on an addressable LED strip
#[derive(Parser, Debug)]
#[command(name = "etherlightd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (.toml, or .json)
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Poll the switch and drive the strip (default)
    Run,
    /// Query the switch once and print model, name and port count as JSON
    Detect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = EtherlightConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    init_logging(&config.logging.level)?;
    config.validate()?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_daemon(config).await,
        Command::Detect => detect(config).await,
    }
}

/// Initialize structured logging. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("failed to set logger: {}", e))
}

async fn detect(config: EtherlightConfig) -> anyhow::Result<()> {
    let ctx = AppContext::with_udp_snmp(config);
    let detected = ctx.acquirer().detect_switch().await?;
    println!("{}", serde_json::to_string_pretty(&detected)?);
    Ok(())
}

async fn run_daemon(config: EtherlightConfig) -> anyhow::Result<()> {
    info!(
        switch = %config.device.switch_host,
        ports = config.port_count(),
        leds_per_port = config.leds_per_port(),
        "etherlightd starting"
    );

    // No hardware driver is built in; swap in any LedSink here
    let mut strip = MemoryStrip::new(config.port_count(), config.leds_per_port())
        .with_output(config.led.brightness, ColorOrder::from_name(&config.led.color_order));
    let boot = config.boot_animation();

    let ctx = AppContext::with_udp_snmp(config);
    setup_signal_handlers(ctx.cancel_token());

    rainbow_cycle(&mut strip, boot, &ctx.cancel_token()).await;

    let workers = ctx.spawn(strip);
    ctx.cancel_token().cancelled().await;
    info!("shutting down");

    if workers.join().await.is_none() {
        warn!("compositor did not return the strip");
    }
    info!("etherlightd exiting");
    Ok(())
}

/// Cancels `cancel` on Ctrl-C or SIGTERM.
fn setup_signal_handlers(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(term) => term,
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable");
                    let _ = signal::ctrl_c().await;
                    cancel.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = signal::ctrl_c() => info!("received SIGINT"),
                _ = term.recv() => info!("received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = signal::ctrl_c().await;
            info!("received Ctrl-C");
        }
        cancel.cancel();
    });
}
