//! In-memory broker for tests.
//!
//! Each topic is an append-only log. Every reader starts at the beginning of
//! the log and keeps its own cursor, so messages published before a worker
//! subscribes are still delivered. Consumer groups are recorded but not
//! enforced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use super::broker::{BrokerConnector, BrokerError, BrokerMessage, TopicReader};

type LogEntry = Result<BrokerMessage, String>;

struct TopicLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    len: watch::Sender<usize>,
}

impl TopicLog {
    fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            len: watch::channel(0).0,
        }
    }

    fn append(&self, mut entry: LogEntry) {
        let len = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if let Ok(message) = entry.as_mut() {
                message.offset = entries.len() as u64;
            }
            entries.push(entry);
            entries.len()
        };
        self.len.send_replace(len);
    }
}

/// A subscription that was opened against the test broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
    pub group: Option<String>,
}

/// In-memory broker that tracks subscriptions for assertions.
#[derive(Clone, Default)]
pub struct TestBroker {
    topics: Arc<RwLock<HashMap<String, TopicLog>>>,
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
}

impl TestBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_topic<R>(&self, topic: &str, f: impl FnOnce(&TopicLog) -> R) -> R {
        {
            let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
            if let Some(log) = topics.get(topic) {
                return f(log);
            }
        }
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        f(topics.entry(topic.to_string()).or_insert_with(TopicLog::new))
    }

    /// Append a message to a topic.
    pub fn publish(&self, topic: &str, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        let message = BrokerMessage::new(topic, key, value);
        self.with_topic(topic, |log| log.append(Ok(message)));
    }

    /// Make the next read at this position of the topic fail.
    pub fn fail(&self, topic: &str, reason: impl Into<String>) {
        let reason = reason.into();
        self.with_topic(topic, |log| log.append(Err(reason)));
    }

    /// Get all subscriptions that were opened.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Check if a reader was opened for a topic.
    pub fn was_subscribed_to(&self, topic: &str) -> bool {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|s| s.topic == topic)
    }
}

#[async_trait]
impl BrokerConnector for TestBroker {
    async fn reader(
        &self,
        topic: &str,
        group: Option<&str>,
    ) -> Result<Box<dyn TopicReader>, BrokerError> {
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Subscription {
                topic: topic.to_string(),
                group: group.map(str::to_string),
            });

        let (entries, len) =
            self.with_topic(topic, |log| (log.entries.clone(), log.len.subscribe()));

        Ok(Box::new(TestTopicReader {
            topic: topic.to_string(),
            entries,
            len,
            cursor: 0,
        }))
    }
}

struct TestTopicReader {
    topic: String,
    entries: Arc<Mutex<Vec<LogEntry>>>,
    len: watch::Receiver<usize>,
    cursor: usize,
}

#[async_trait]
impl TopicReader for TestTopicReader {
    async fn read_message(&mut self) -> Result<BrokerMessage, BrokerError> {
        loop {
            let next = {
                let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
                entries.get(self.cursor).cloned()
            };

            if let Some(entry) = next {
                self.cursor += 1;
                return entry.map_err(|reason| BrokerError::Read {
                    topic: self.topic.clone(),
                    reason,
                });
            }

            if self.len.changed().await.is_err() {
                return Err(BrokerError::Closed {
                    topic: self.topic.clone(),
                });
            }
        }
    }
}
