//! Meterwatch batch runner
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - METERWATCH_SNAPSHOT: JSON store snapshot (default: meterwatch.json)
//! - METERWATCH_WEBHOOK_URL: Mail relay webhook (default: log notifications)
//! - METERWATCH_DEFINITION_ID: Evaluate a single definition
//! - METERWATCH_FIRST_RUN_LOOKBACK_HOURS: Window when no run marker exists (default: 24)
//! - RUST_LOG: Log level (default: meterwatch=info)

use std::sync::Arc;

use meterwatch::alerts::{AlertManager, Notifier};
use meterwatch::storage::{MemoryStore, StoreSnapshot};
use meterwatch::RunnerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meterwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RunnerConfig::from_env();
    tracing::info!(
        snapshot = %config.snapshot_path.display(),
        webhook = config.webhook_url.is_some(),
        definition_id = ?config.definition_id,
        "Meterwatch configuration"
    );

    let snapshot = StoreSnapshot::load(&config.snapshot_path)?;
    let store = Arc::new(MemoryStore::from_snapshot(snapshot));
    let manager = AlertManager::new(store.clone(), Arc::new(Notifier::new(config.notify_target())))
        .with_config(config.manager_config());

    let now = chrono::Local::now().naive_local();
    let result = match config.definition_id {
        Some(id) => manager.run_definition(id, now).await,
        None => manager.run(now).await,
    };

    // appended alerts and notifications are kept even when the run aborts
    store.to_snapshot().save(&config.snapshot_path)?;

    let report = result?;
    tracing::info!(
        alerts = report.alerts_saved,
        notifications = report.notifications_sent,
        "Done"
    );
    Ok(())
}
