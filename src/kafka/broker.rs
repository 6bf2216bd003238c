//! Broker abstraction
//!
//! The `MessageBroker` trait separates the demo from the client library so
//! that the producer, the listener container and the orchestrator can run
//! against a real Kafka cluster (`KafkaBroker`) or the in-process simulation
//! (`InMemoryBroker`) without knowing which one they hold.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use super::error::Result;
use super::messages::{OutboundMessage, ReceivedMessage, SendResult, TopicSpec};

/// Stream of deliveries for one consumer, closed when the broker drops it
pub type DeliveryStream = UnboundedReceiver<Result<ReceivedMessage>>;

/// What a consumer reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// Group-managed subscription: the broker assigns partitions within the group
    Topics(Vec<String>),
    /// Manual assignment of explicit partitions, bypassing group assignment
    Partitions { topic: String, partitions: Vec<i32> },
}

impl Subscription {
    /// Topics this subscription touches
    pub fn topics(&self) -> Vec<&str> {
        match self {
            Subscription::Topics(topics) => topics.iter().map(String::as_str).collect(),
            Subscription::Partitions { topic, .. } => vec![topic.as_str()],
        }
    }
}

/// Request to open one consumer for one listener
#[derive(Debug, Clone)]
pub struct ConsumerRequest {
    /// Listener name, used for logging and client ids
    pub listener: String,
    /// Consumer group the consumer joins (and commits offsets under)
    pub group_id: String,
    pub subscription: Subscription,
}

/// Connection to a message broker
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Append a message and wait for the broker's acknowledgment
    async fn publish(&self, message: &OutboundMessage) -> Result<SendResult>;

    /// Open a consumer; deliveries arrive on the returned stream
    ///
    /// The subscription (or manual assignment) is registered before this
    /// returns. Group assignment may complete later; consumers start from
    /// the earliest uncommitted offset, so records published after this
    /// returns are still delivered.
    async fn open_consumer(&self, request: ConsumerRequest) -> Result<DeliveryStream>;

    /// Make sure the given topics exist, creating missing ones
    async fn ensure_topics(&self, topics: &[TopicSpec]) -> Result<()>;

    /// Check that the broker answers before any work starts
    async fn health_check(&self) -> Result<()>;

    /// Wait for in-flight publishes to complete
    fn flush(&self, timeout: Duration) -> Result<()>;

    /// Short name for logs ("kafka", "memory")
    fn name(&self) -> &'static str;
}
