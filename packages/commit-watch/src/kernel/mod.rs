//! Kernel module - broker access, collaborators and service supervision.

pub mod broker;
pub mod log_sinks;
pub mod nats;
pub mod service_host;
pub mod test_broker;
pub mod test_dependencies;
pub mod traits;

pub use broker::{BrokerConnector, BrokerError, BrokerMessage, TopicReader};
pub use log_sinks::{LoggingCompletionCallback, LoggingConsequenceDispatcher};
pub use nats::{NatsConnector, NatsTopicReader, KEY_HEADER};
pub use service_host::{Service, ServiceHost};
pub use test_broker::{Subscription, TestBroker};
pub use test_dependencies::{TestCompletionCallback, TestConsequenceDispatcher};
pub use traits::*;
