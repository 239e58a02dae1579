//! Broker seam - topic-scoped readers over a partitioned log broker.
//!
//! Workers never share a connection: each one asks a [`BrokerConnector`] for
//! its own [`TopicReader`] and releases it when its loop exits.
//!
//! ```text
//! BrokerConnector (shared, Arc)
//!     │
//!     ├─► reader("control", group)   ─► watchdog consumer
//!     ├─► reader("data.orders", group) ─► validator worker
//!     └─► reader("data.users", group)  ─► validator worker
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// A message read from a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub key: Bytes,
    pub value: Bytes,
    /// Delivery position of this message as seen by its reader.
    pub offset: u64,
}

impl BrokerMessage {
    pub fn new(topic: impl Into<String>, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            value: value.into(),
            offset: 0,
        }
    }

    /// Key rendered for logs.
    pub fn key_lossy(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }
}

/// Transport failures. Fatal to the worker that owns the reader.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not open a connection or subscription
    #[error("failed to connect to broker for topic {topic}: {source}")]
    Connect {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A read from an open subscription failed
    #[error("read failed on topic {topic}: {reason}")]
    Read { topic: String, reason: String },

    /// The subscription ended
    #[error("subscription to topic {topic} closed")]
    Closed { topic: String },
}

/// Exclusive, blocking reader for one topic.
#[async_trait]
pub trait TopicReader: Send {
    /// Wait for the next message. Callers that need cancellation race this
    /// against their shutdown token.
    async fn read_message(&mut self) -> Result<BrokerMessage, BrokerError>;

    /// Release the underlying connection.
    async fn close(&mut self) {}
}

/// Opens fresh readers. One call, one connection.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Open a reader for `topic`.
    ///
    /// `group = None` reads without a consumer group, so every instance sees
    /// every message.
    async fn reader(
        &self,
        topic: &str,
        group: Option<&str>,
    ) -> Result<Box<dyn TopicReader>, BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lossy() {
        let msg = BrokerMessage::new("control", Bytes::from_static(b"tx-1"), Bytes::new());
        assert_eq!(msg.key_lossy(), "tx-1");
        assert_eq!(msg.offset, 0);
    }

    #[test]
    fn test_error_messages_name_topic() {
        let err = BrokerError::Closed {
            topic: "data.test".to_string(),
        };
        assert_eq!(err.to_string(), "subscription to topic data.test closed");
    }
}
