//! Run command - start every configured bypass and relay until interrupted

use anyhow::{bail, Context, Result};
use bypass_core::config::{BypassConfig, ServiceConfig};
use bypass_core::{Router, TransformBuilder};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Service configuration file
    #[arg(short = 'c', long, default_value = "bypass.toml", env = "DPI_BYPASS_CONFIG")]
    pub config: PathBuf,

    /// Only start the bypasses with these IDs
    #[arg(long, value_name = "ID")]
    pub only: Vec<String>,

    /// Validate the configuration and build every transform without binding
    #[arg(long)]
    pub dry_run: bool,
}

/// Load and validate the service file named by `args`
pub fn load_config(args: &RunArgs) -> Result<ServiceConfig> {
    let config = ServiceConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Bypasses selected by `--only`, in file order
fn selected<'a>(config: &'a ServiceConfig, only: &[String]) -> Result<Vec<&'a BypassConfig>> {
    if let Some(missing) = only.iter().find(|id| !config.bypasses.iter().any(|b| &b.id == *id)) {
        bail!("No bypass with id '{missing}' in the configuration");
    }

    Ok(config
        .bypasses
        .iter()
        .filter(|b| only.is_empty() || only.contains(&b.id))
        .collect())
}

/// Execute the run command
pub fn execute(args: RunArgs, config: ServiceConfig) -> Result<()> {
    let bypasses = selected(&config, &args.only)?;
    if bypasses.is_empty() {
        bail!("No bypasses configured in {}", args.config.display());
    }

    if args.dry_run {
        for bypass in &bypasses {
            let transform = TransformBuilder::from_config(bypass)
                .with_context(|| format!("Invalid parameters for bypass '{}'", bypass.id))?;
            info!(id = %bypass.id, method = %bypass.method, transform = transform.name(), "Bypass ready");
        }
        warn!("Dry run mode - no listeners were bound");
        return Ok(());
    }

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if config.runtime.worker_threads > 0 {
        builder.worker_threads(config.runtime.worker_threads);
    }
    let runtime = builder.build().context("Failed to build Tokio runtime")?;

    let owned: Vec<BypassConfig> = bypasses.into_iter().cloned().collect();
    let interval = Duration::from_secs(config.runtime.stats_interval_secs);
    runtime.block_on(serve(owned, interval))
}

async fn serve(bypasses: Vec<BypassConfig>, stats_interval: Duration) -> Result<()> {
    let router = Router::new();
    let mut failed = 0usize;

    for bypass in &bypasses {
        match router.start(bypass) {
            Ok(()) => {
                if let Some(addr) = router.local_addr(&bypass.id) {
                    println!(
                        "  {:<20} {:<14} {} -> {}",
                        bypass.id,
                        bypass.method,
                        addr,
                        bypass.remote_addr()
                    );
                }
            }
            Err(e) => {
                error!(id = %bypass.id, error = %e, "Failed to start bypass");
                failed += 1;
            }
        }
    }

    if failed == bypasses.len() {
        bail!("None of the {failed} configured bypasses could be started");
    }
    info!(running = bypasses.len() - failed, failed, "Bypasses started");

    // Set up signal handler
    let shutdown = Arc::new(Notify::new());
    let notify = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        notify.notify_one();
    })
    .context("Failed to set signal handler")?;

    let mut ticker = tokio::time::interval(stats_interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            () = shutdown.notified() => break,
            _ = ticker.tick() => report_stats(&router),
        }
    }

    report_stats(&router);
    let stopped = router.stop_all();
    info!(stopped, "dpi-bypass stopped");
    Ok(())
}

fn report_stats(router: &Router) {
    for id in router.running_ids() {
        match router.stats(&id) {
            Ok(Some(stats)) => info!(
                id = %stats.id,
                bytes_rx = stats.bytes_rx,
                bytes_tx = stats.bytes_tx,
                connections = stats.connections,
                errors = stats.error_count,
                "Bypass stats"
            ),
            Ok(None) => {}
            Err(e) => warn!(id = %id, error = %e, "Failed to read stats"),
        }
    }
}
