use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::actor::{Watchdog, WatchdogHandle};
use super::events::ControlSignal;
use super::WatchdogConfig;
use crate::kernel::{BaseCompletionCallback, BrokerConnector, Service, TopicReader};

/// Consumes the control topic and drives the watchdog actor.
///
/// Owns one broker reader for its lifetime. A read error stops the actor and
/// fails the service.
pub struct WatchdogService {
    broker: Arc<dyn BrokerConnector>,
    callback: Arc<dyn BaseCompletionCallback>,
    config: WatchdogConfig,
}

impl WatchdogService {
    pub fn new(
        broker: Arc<dyn BrokerConnector>,
        callback: Arc<dyn BaseCompletionCallback>,
        config: WatchdogConfig,
    ) -> Self {
        Self {
            broker,
            callback,
            config,
        }
    }

    async fn consume(
        &self,
        reader: &mut dyn TopicReader,
        handle: &WatchdogHandle,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                read = reader.read_message() => read.context("control topic read failed")?,
            };

            let Some(signal) = ControlSignal::from_message(&message) else {
                warn!(
                    topic = %message.topic,
                    offset = message.offset,
                    "skipping control message without a transaction id"
                );
                continue;
            };

            debug!(
                transaction_id = %signal.transaction_id(),
                offset = message.offset,
                complete = matches!(signal, ControlSignal::Complete { .. }),
                "control signal"
            );

            // A full mailbox must not hold up shutdown
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                sent = handle.apply(signal) => sent.context("watchdog stopped while consuming")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{TestBroker, TestCompletionCallback};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_mailbox_full_is_clean() {
        let broker = TestBroker::new();
        broker.publish("control", "tx-1", "/a");
        broker.publish("control", "tx-2", "/b");

        let callback = Arc::new(TestCompletionCallback::new());
        let config = WatchdogConfig {
            mailbox_capacity: 1,
            ..WatchdogConfig::default()
        };
        let service = WatchdogService::new(
            Arc::new(broker.clone()),
            callback.clone(),
            config.clone(),
        );

        // The actor is never run, so the second signal finds the mailbox full
        let (_watchdog, handle) = Watchdog::new(&config, callback);
        let mut reader = broker.reader("control", None).await.unwrap();

        let shutdown = CancellationToken::new();
        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            service.consume(reader.as_mut(), &handle, &shutdown),
        )
        .await
        .expect("consumer should stop on shutdown");

        assert!(result.is_ok());
    }
}

#[async_trait]
impl Service for WatchdogService {
    fn name(&self) -> &str {
        "watchdog"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut reader = self
            .broker
            .reader(&self.config.control_topic, self.config.group.as_deref())
            .await
            .context("failed to open control topic")?;

        info!(
            topic = %self.config.control_topic,
            group = ?self.config.group,
            "watchdog consuming control topic"
        );

        let (watchdog, handle) = Watchdog::new(&self.config, self.callback.clone());
        let actor_token = shutdown.child_token();
        let actor = tokio::spawn(watchdog.run(actor_token.clone()));

        let result = self.consume(reader.as_mut(), &handle, &shutdown).await;

        reader.close().await;
        actor_token.cancel();
        if let Err(e) = actor.await {
            warn!(error = %e, "watchdog actor task panicked");
        }

        result
    }
}
