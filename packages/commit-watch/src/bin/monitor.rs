//! Transaction monitor
//!
//! Consumes the control topic and fires the completion callback for every
//! transaction that misses its deadline.

use std::sync::Arc;

use anyhow::{Context, Result};
use commit_watch::domains::watchdog::WatchdogService;
use commit_watch::kernel::{LoggingCompletionCallback, NatsConnector, ServiceHost};
use commit_watch::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,commit_watch=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!(
        broker_url = %config.broker_url,
        control_topic = %config.control_topic,
        timeout_secs = config.transaction_timeout.as_secs(),
        "Starting transaction monitor"
    );

    let broker = Arc::new(NatsConnector::new(config.broker_url.clone()));
    let service = WatchdogService::new(broker, Arc::new(LoggingCompletionCallback), config.watchdog());

    ServiceHost::new()
        .with_service(service)
        .run_until_shutdown()
        .await
}
