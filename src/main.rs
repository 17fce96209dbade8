//! Equitrix scanner
//!
//! Runs the unified market-scan scheduler with the built-in in-memory
//! collaborators. Production deployments replace the placeholder broker,
//! store and notifier with real integrations through the same interfaces.

use dotenvy::dotenv;
use equitrix::clock::SystemClock;
use equitrix::config::Config;
use equitrix::scheduler;
use equitrix::services::{
    FixedRiskPolicy, LogNotifier, MemorySignalStore, PlaceholderBrokerClient,
};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = Config::from_env()?;
    config.init_logging();
    info!(
        environment = %equitrix::config::get_environment(),
        timezone = %config.timezone,
        parallelism = config.parallelism,
        "Starting Equitrix scanner"
    );

    let scheduler = scheduler::build(
        &config,
        Arc::new(PlaceholderBrokerClient),
        Arc::new(MemorySignalStore::new()),
        Arc::new(LogNotifier),
        Arc::new(FixedRiskPolicy::default()),
        Arc::new(SystemClock),
    )?;

    scheduler.start();
    for (trigger, at) in scheduler.next_runs() {
        info!(trigger = %trigger, next_run = %at, "Trigger '{}' next run at {}", trigger, at);
    }

    info!("Scanner started, waiting for shutdown signal...");
    signal::ctrl_c().await?;
    info!("Shutting down scanner...");
    scheduler.stop_default().await;
    info!("Scanner stopped");

    Ok(())
}
