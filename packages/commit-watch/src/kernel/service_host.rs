//! Long-running service supervision.
//!
//! Every worker loop in this crate is a [`Service`]. The [`ServiceHost`] runs
//! each one on its own task under a child of one root [`CancellationToken`]:
//!
//! ```text
//! ServiceHost
//!     │
//!     ├─► root token ─► child ─► WatchdogService.run()
//!     │             └─► child ─► ValidatorWorker.run()  (one per schema)
//!     │
//!     └─► Ctrl-C ─► root.cancel() ─► every loop exits at its next read
//! ```
//!
//! A service that returns an error is logged and recorded. Its siblings keep
//! running; the host reports the failure once everything has stopped so the
//! process exits non-zero and an external supervisor can restart it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A long-running unit of work that stops when its shutdown token is cancelled.
#[async_trait]
pub trait Service: Send + 'static {
    fn name(&self) -> &str;

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()>;
}

/// Runs a set of services until they stop or shutdown is requested.
pub struct ServiceHost {
    services: Vec<Box<dyn Service>>,
    shutdown: CancellationToken,
}

impl ServiceHost {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_service<S: Service>(mut self, service: S) -> Self {
        self.services.push(Box::new(service));
        self
    }

    /// Root token. Cancelling it stops every service.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Run until Ctrl-C, then cancel and wait for every service to stop.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown.clone();
        let signal = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("received interrupt, shutting down"),
                        Err(e) => error!(error = %e, "failed to listen for interrupt, shutting down"),
                    }
                    shutdown.cancel();
                }
            }
        });

        let result = self.run().await;
        signal.abort();
        result
    }

    /// Run every service to completion.
    ///
    /// Returns an error naming the failed services if any of them failed.
    pub async fn run(self) -> Result<()> {
        let mut tasks = JoinSet::new();

        for service in self.services {
            let name = service.name().to_string();
            let token = self.shutdown.child_token();
            info!(service = %name, "starting service");
            tasks.spawn(async move { (name, service.run(token).await) });
        }

        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => info!(service = %name, "service stopped"),
                Ok((name, Err(e))) => {
                    error!(service = %name, error = ?e, "service failed");
                    failed.push(name);
                }
                Err(e) => {
                    error!(error = %e, "service task panicked");
                    failed.push("<panicked>".to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("services failed: {}", failed.join(", ")))
        }
    }
}

impl Default for ServiceHost {
    fn default() -> Self {
        Self::new()
    }
}
