//! NATS adapter for the broker seam.
//!
//! Topics map one-to-one onto NATS subjects. A consumer group becomes a queue
//! group, so "no group" means a plain subscription where every instance sees
//! every message. The message key travels in the [`KEY_HEADER`] header.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info};

use super::broker::{BrokerConnector, BrokerError, BrokerMessage, TopicReader};

/// Header carrying the message key.
pub const KEY_HEADER: &str = "Message-Key";

/// Connector that opens one NATS connection per reader.
#[derive(Debug, Clone)]
pub struct NatsConnector {
    url: String,
}

impl NatsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl BrokerConnector for NatsConnector {
    async fn reader(
        &self,
        topic: &str,
        group: Option<&str>,
    ) -> Result<Box<dyn TopicReader>, BrokerError> {
        let connect_err = |source: Box<dyn std::error::Error + Send + Sync>| BrokerError::Connect {
            topic: topic.to_string(),
            source,
        };

        let client = async_nats::connect(self.url.as_str())
            .await
            .map_err(|e| connect_err(Box::new(e)))?;

        let subscriber = match group {
            Some(group) => client
                .queue_subscribe(topic.to_string(), group.to_string())
                .await
                .map_err(|e| connect_err(Box::new(e)))?,
            None => client
                .subscribe(topic.to_string())
                .await
                .map_err(|e| connect_err(Box::new(e)))?,
        };

        info!(url = %self.url, topic = %topic, group = ?group, "subscribed to topic");

        Ok(Box::new(NatsTopicReader {
            topic: topic.to_string(),
            _client: client,
            subscriber,
            next_offset: 0,
        }))
    }
}

/// Reader owning its own client connection and subscription.
pub struct NatsTopicReader {
    topic: String,
    // Held so the connection lives exactly as long as the reader.
    _client: async_nats::Client,
    subscriber: async_nats::Subscriber,
    next_offset: u64,
}

#[async_trait]
impl TopicReader for NatsTopicReader {
    async fn read_message(&mut self) -> Result<BrokerMessage, BrokerError> {
        let Some(message) = self.subscriber.next().await else {
            return Err(BrokerError::Closed {
                topic: self.topic.clone(),
            });
        };

        let key = message
            .headers
            .as_ref()
            .and_then(|headers| headers.get(KEY_HEADER))
            .map(|value| Bytes::copy_from_slice(value.as_str().as_bytes()))
            .unwrap_or_default();

        let offset = self.next_offset;
        self.next_offset += 1;

        Ok(BrokerMessage {
            topic: message.subject.to_string(),
            key,
            value: message.payload,
            offset,
        })
    }

    async fn close(&mut self) {
        if let Err(e) = self.subscriber.unsubscribe().await {
            debug!(topic = %self.topic, error = %e, "unsubscribe failed during close");
        }
    }
}
