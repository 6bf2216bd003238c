// Test helpers for kafka_demo integration tests
//
// Every test runs against the in-process simulated broker, so no Kafka
// cluster is needed. Each test file pulls this in with `mod helpers;` and
// uses a subset, hence the dead_code allowance.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use kafka_demo::kafka::{
    ConsumerRequest, DeliveryCallback, DeliveryStream, Handler, InMemoryBroker, MessageBroker,
    OutboundMessage, ReceivedMessage, RecordHeaders, SendResult, TopicSpec,
};
use kafka_demo::{BrokerMode, Config, DemoError};

/// Config pointed at the simulated broker with a short latch timeout
pub fn memory_config() -> Config {
    Config {
        broker_mode: BrokerMode::Memory,
        latch_timeout_ms: 2_000,
        ..Config::default()
    }
}

/// Simulated broker with the topics `config` expects
pub fn demo_broker(config: &Config) -> Arc<InMemoryBroker> {
    let broker = Arc::new(InMemoryBroker::new());
    for topic in config.topics() {
        broker
            .create_topic(&topic.name, topic.partitions)
            .expect("topic spec should be valid");
    }
    broker
}

/// Simulated broker that refuses every publish to one partition
pub struct RejectingBroker {
    pub inner: Arc<InMemoryBroker>,
    topic: String,
    partition: i32,
}

impl RejectingBroker {
    pub fn new(inner: Arc<InMemoryBroker>, topic: &str, partition: i32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            topic: topic.to_string(),
            partition,
        })
    }
}

#[async_trait]
impl MessageBroker for RejectingBroker {
    async fn publish(&self, message: &OutboundMessage) -> kafka_demo::Result<SendResult> {
        if message.topic == self.topic && message.partition == Some(self.partition) {
            return Err(DemoError::Publish {
                topic: message.topic.clone(),
                partition: self.partition,
                error: "Broker: Not leader for partition".to_string(),
            });
        }
        self.inner.publish(message).await
    }

    async fn open_consumer(&self, request: ConsumerRequest) -> kafka_demo::Result<DeliveryStream> {
        self.inner.open_consumer(request).await
    }

    async fn health_check(&self) -> kafka_demo::Result<()> {
        self.inner.health_check().await
    }

    async fn ensure_topics(&self, topics: &[TopicSpec]) -> kafka_demo::Result<()> {
        self.inner.ensure_topics(topics).await
    }

    fn flush(&self, timeout: Duration) -> kafka_demo::Result<()> {
        self.inner.flush(timeout)
    }

    fn name(&self) -> &'static str {
        "rejecting"
    }
}

/// Records every delivery a handler receives
#[derive(Default, Clone)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<(ReceivedMessage, RecordHeaders)>>>,
}

impl Recorder {
    pub fn handler(&self) -> Handler {
        let seen = self.seen.clone();
        Arc::new(move |message: &ReceivedMessage, headers: &RecordHeaders| {
            seen.lock().push((message.clone(), headers.clone()));
        })
    }

    pub fn payloads(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(m, _)| m.payload.clone()).collect()
    }

    pub fn partitions(&self) -> Vec<i32> {
        self.seen.lock().iter().map(|(m, _)| m.partition).collect()
    }

    pub fn headers(&self) -> Vec<RecordHeaders> {
        self.seen.lock().iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }
}

/// Counts delivery callback outcomes
#[derive(Default)]
pub struct CountingCallback {
    pub successes: Mutex<Vec<SendResult>>,
    pub failures: Mutex<Vec<String>>,
}

impl DeliveryCallback for CountingCallback {
    fn on_success(&self, _message: &OutboundMessage, result: &SendResult) {
        self.successes.lock().push(*result);
    }

    fn on_failure(&self, _message: &OutboundMessage, error: &DemoError) {
        self.failures.lock().push(error.to_string());
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
