//! Message producer
//!
//! Thin wrapper over a `MessageBroker` that validates outbound messages,
//! reports each publish through a `DeliveryCallback`, and knows the demo's
//! three topics. Failures are logged and returned; retries are left to the
//! client library.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::broker::MessageBroker;
use super::error::{DemoError, Result};
use super::messages::{OutboundMessage, SendResult};
use crate::config::Config;

/// Receives the outcome of a publish
///
/// Exactly one of the two methods is called per publish.
pub trait DeliveryCallback {
    fn on_success(&self, message: &OutboundMessage, result: &SendResult);
    fn on_failure(&self, message: &OutboundMessage, error: &DemoError);
}

/// Callback that logs the outcome
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCallback;

impl DeliveryCallback for LoggingCallback {
    fn on_success(&self, message: &OutboundMessage, result: &SendResult) {
        info!(
            "Sent message=[{}] to {}[{}] with offset=[{}]",
            message.payload, message.topic, result.partition, result.offset
        );
    }

    fn on_failure(&self, message: &OutboundMessage, error: &DemoError) {
        warn!("Unable to send message=[{}] due to: {}", message.payload, error);
    }
}

/// Names of the topics the demo helpers publish to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicNames {
    pub message: String,
    pub partitioned: String,
    pub filtered: String,
}

impl TopicNames {
    pub fn from_config(config: &Config) -> Self {
        Self {
            message: config.message_topic.clone(),
            partitioned: config.partitioned_topic.clone(),
            filtered: config.filtered_topic.clone(),
        }
    }
}

/// Producer sending text messages through a broker handle
#[derive(Clone)]
pub struct MessageProducer {
    broker: Arc<dyn MessageBroker>,
    topics: TopicNames,
}

impl MessageProducer {
    pub fn new(broker: Arc<dyn MessageBroker>, topics: TopicNames) -> Self {
        Self { broker, topics }
    }

    pub fn topics(&self) -> &TopicNames {
        &self.topics
    }

    /// Publish `message` to `topic`, letting the broker pick the partition
    pub async fn send(&self, topic: &str, message: &str) -> Result<SendResult> {
        self.publish(OutboundMessage::new(topic, message)).await
    }

    /// Publish `message` to an explicit partition of `topic`
    ///
    /// The partition is validated by the broker, not here.
    pub async fn send_to_partition(
        &self,
        topic: &str,
        partition: i32,
        message: &str,
    ) -> Result<SendResult> {
        self.publish(OutboundMessage::new(topic, message).with_partition(partition))
            .await
    }

    /// Publish a keyed message; the key decides the partition
    pub async fn send_keyed(&self, topic: &str, key: &str, message: &str) -> Result<SendResult> {
        self.publish(OutboundMessage::new(topic, message).with_key(key))
            .await
    }

    /// Publish and report the outcome to `callback`
    ///
    /// Validation failures are reported through `on_failure` as well.
    pub async fn send_with_callback<C>(
        &self,
        message: OutboundMessage,
        callback: &C,
    ) -> Result<SendResult>
    where
        C: DeliveryCallback + ?Sized,
    {
        match self.publish(message.clone()).await {
            Ok(result) => {
                callback.on_success(&message, &result);
                Ok(result)
            }
            Err(e) => {
                callback.on_failure(&message, &e);
                Err(e)
            }
        }
    }

    /// Publish to the basic message topic, logging the committed offset
    pub async fn send_message(&self, message: &str) -> Result<SendResult> {
        let outbound = OutboundMessage::new(&self.topics.message, message);
        self.send_with_callback(outbound, &LoggingCallback).await
    }

    /// Publish to one partition of the partitioned topic
    pub async fn send_message_to_partition(
        &self,
        message: &str,
        partition: i32,
    ) -> Result<SendResult> {
        let outbound = OutboundMessage::new(&self.topics.partitioned, message).with_partition(partition);
        self.send_with_callback(outbound, &LoggingCallback).await
    }

    /// Publish to the filtered topic
    pub async fn send_message_to_filtered(&self, message: &str) -> Result<SendResult> {
        let outbound = OutboundMessage::new(&self.topics.filtered, message);
        self.send_with_callback(outbound, &LoggingCallback).await
    }

    /// Wait for in-flight publishes
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.broker.flush(timeout)
    }

    async fn publish(&self, message: OutboundMessage) -> Result<SendResult> {
        message.validate()?;
        debug!(
            "Publishing to '{}' (partition {:?}) via {} broker",
            message.topic,
            message.partition,
            self.broker.name()
        );
        self.broker.publish(&message).await
    }
}

impl std::fmt::Debug for MessageProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageProducer")
            .field("broker", &self.broker.name())
            .field("topics", &self.topics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::memory::InMemoryBroker;
    use crate::testing::RecordingCallback;

    fn producer() -> (Arc<InMemoryBroker>, MessageProducer) {
        let broker = Arc::new(InMemoryBroker::new());
        broker.create_topic("topic1", 1).unwrap();
        broker.create_topic("partitioned", 5).unwrap();
        broker.create_topic("filtered", 1).unwrap();
        let producer = MessageProducer::new(
            broker.clone(),
            TopicNames::from_config(&Config::default()),
        );
        (broker, producer)
    }

    #[tokio::test]
    async fn test_send_returns_committed_offsets() {
        let (_broker, producer) = producer();
        let first = producer.send("topic1", "one").await.unwrap();
        let second = producer.send("topic1", "two").await.unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 1);
    }

    #[tokio::test]
    async fn test_send_to_partition_lands_on_partition() {
        let (broker, producer) = producer();
        let result = producer.send_to_partition("partitioned", 3, "m").await.unwrap();
        assert_eq!(result.partition, 3);
        assert_eq!(broker.payloads("partitioned", 3), vec!["m".to_string()]);
    }

    #[tokio::test]
    async fn test_keyed_send_is_stable() {
        let (_broker, producer) = producer();
        let a = producer.send_keyed("partitioned", "user-1", "x").await.unwrap();
        let b = producer.send_keyed("partitioned", "user-1", "y").await.unwrap();
        assert_eq!(a.partition, b.partition);
        assert_eq!(b.offset, a.offset + 1);
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected_locally() {
        let (broker, producer) = producer();
        assert!(matches!(
            producer.send("", "m").await,
            Err(DemoError::InvalidArgument(_))
        ));
        assert!(matches!(
            producer.send("topic1", "").await,
            Err(DemoError::InvalidArgument(_))
        ));
        assert!(broker.payloads("topic1", 0).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_partition_rejected_by_broker() {
        let (_broker, producer) = producer();
        let err = producer
            .send_to_partition("partitioned", 5, "m")
            .await
            .unwrap_err();
        assert!(matches!(err, DemoError::UnknownPartition { partition: 5, .. }));
    }

    #[tokio::test]
    async fn test_callback_sees_exactly_one_outcome() {
        let (broker, producer) = producer();
        let callback = RecordingCallback::default();

        producer
            .send_with_callback(OutboundMessage::new("topic1", "ok"), &callback)
            .await
            .unwrap();
        assert_eq!(callback.successes(), 1);
        assert_eq!(callback.failures(), 0);

        broker.set_reachable(false);
        let result = producer
            .send_with_callback(OutboundMessage::new("topic1", "lost"), &callback)
            .await;
        assert!(result.is_err());
        assert_eq!(callback.successes(), 1);
        assert_eq!(callback.failures(), 1);
        assert!(callback.last_error().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_demo_helpers_target_configured_topics() {
        let (broker, producer) = producer();
        producer.send_message("Hello, World!").await.unwrap();
        producer.send_message_to_partition("p", 4).await.unwrap();
        producer.send_message_to_filtered("f").await.unwrap();

        assert_eq!(broker.payloads("topic1", 0), vec!["Hello, World!".to_string()]);
        assert_eq!(broker.payloads("partitioned", 4), vec!["p".to_string()]);
        assert_eq!(broker.payloads("filtered", 0), vec!["f".to_string()]);
        assert!(producer.flush(Duration::from_millis(10)).is_ok());
    }
}
