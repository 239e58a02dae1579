use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::catalog::ValidatorSpec;
use super::walker::{validate, Verdict};
use crate::kernel::{
    BaseConsequenceDispatcher, BrokerConnector, BrokerMessage, ConsequenceNotice, Service,
    TopicReader,
};

/// Validates every payload on one topic against one [`ValidatorSpec`].
pub struct ValidatorWorker {
    spec: Arc<ValidatorSpec>,
    broker: Arc<dyn BrokerConnector>,
    dispatcher: Arc<dyn BaseConsequenceDispatcher>,
    group: Option<String>,
    name: String,
}

impl ValidatorWorker {
    pub fn new(
        spec: Arc<ValidatorSpec>,
        broker: Arc<dyn BrokerConnector>,
        dispatcher: Arc<dyn BaseConsequenceDispatcher>,
        group: Option<String>,
    ) -> Self {
        // A schema's own group takes precedence over the process default
        let group = spec.group.clone().or(group);
        let name = format!("validator:{}", spec.topic);
        Self {
            spec,
            broker,
            dispatcher,
            group,
            name,
        }
    }

    async fn consume(
        &self,
        reader: &mut dyn TopicReader,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                read = reader.read_message() => read
                    .with_context(|| format!("read failed on topic {}", self.spec.topic))?,
            };

            self.handle(&message, shutdown).await;
        }
    }

    async fn handle(&self, message: &BrokerMessage, shutdown: &CancellationToken) {
        let verdict = validate(&message.value, &self.spec.properties, shutdown);

        match &verdict {
            Verdict::Passed => {
                info!(
                    topic = %message.topic,
                    key = %message.key_lossy(),
                    offset = message.offset,
                    "all clean"
                );
            }
            Verdict::Aborted => {
                warn!(
                    topic = %message.topic,
                    key = %message.key_lossy(),
                    offset = message.offset,
                    "validation interrupted by shutdown, no consequence dispatched"
                );
            }
            Verdict::Undecodable(e) => {
                debug!(topic = %message.topic, offset = message.offset, error = %e, "undecodable payload");
            }
            Verdict::Failed(violation) => {
                debug!(
                    topic = %message.topic,
                    offset = message.offset,
                    path = %violation.path(),
                    "payload failed validation"
                );
            }
        }

        let Some(reason) = verdict.failure_reason() else {
            return;
        };

        let notice = ConsequenceNotice {
            kind: self.spec.consequence,
            endpoint: self.spec.endpoint.clone(),
            template: self.spec.template.clone(),
            topic: message.topic.clone(),
            key: message.key.clone(),
            payload: message.value.clone(),
            reason,
        };

        if let Err(e) = self.dispatcher.dispatch(&notice).await {
            warn!(
                topic = %notice.topic,
                consequence = %notice.kind,
                endpoint = %notice.endpoint,
                error = %e,
                "consequence dispatch failed"
            );
        }
    }
}

#[async_trait]
impl Service for ValidatorWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        let mut reader = self
            .broker
            .reader(&self.spec.topic, self.group.as_deref())
            .await
            .with_context(|| format!("failed to open topic {}", self.spec.topic))?;

        info!(
            topic = %self.spec.topic,
            group = ?self.group,
            properties = self.spec.properties.len(),
            "validator consuming topic"
        );

        let result = self.consume(reader.as_mut(), &shutdown).await;
        reader.close().await;

        info!(topic = %self.spec.topic, "validator stopped");
        result
    }
}
