//! Payload validator
//!
//! Runs one validation worker per catalog entry. Workers fail independently;
//! the process exits non-zero once every worker has stopped if any of them
//! failed.

use std::sync::Arc;

use anyhow::{Context, Result};
use commit_watch::domains::validation::{SchemaCatalog, ValidatorWorker};
use commit_watch::kernel::{
    BaseConsequenceDispatcher, BrokerConnector, LoggingConsequenceDispatcher, NatsConnector,
    ServiceHost,
};
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
    let catalog = SchemaCatalog::builtin();

    tracing::info!(
        broker_url = %config.broker_url,
        validators = catalog.len(),
        "Starting payload validator"
    );

    let broker: Arc<dyn BrokerConnector> = Arc::new(NatsConnector::new(config.broker_url.clone()));
    let dispatcher: Arc<dyn BaseConsequenceDispatcher> = Arc::new(LoggingConsequenceDispatcher);

    let host = catalog.validators().fold(ServiceHost::new(), |host, spec| {
        host.with_service(ValidatorWorker::new(
            spec,
            broker.clone(),
            dispatcher.clone(),
            config.validator_group.clone(),
        ))
    });

    host.run_until_shutdown().await
}
