// In-process simulated broker
//
// InMemoryBroker keeps one append-only log per topic partition and pushes
// every appended record to the consumers that own its partition:
//
// - group-managed consumers share the partitions of a topic within their
//   group (partition p goes to member p % members, in join order), so each
//   group sees each record exactly once;
// - manually assigned consumers see every record of their partitions,
//   regardless of group.
//
// Consumers only see records appended after they were opened, which is what
// a freshly subscribed consumer with no committed offset sees when the log
// starts empty. The broker can be switched unreachable to exercise the
// publish failure path.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, info, warn};

use super::broker::{ConsumerRequest, DeliveryStream, MessageBroker, Subscription};
use super::error::{DemoError, Result};
use super::messages::{OutboundMessage, ReceivedMessage, SendResult, TopicSpec};
use super::partitioner::compute_partition;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Assignment {
    Group,
    Manual(Vec<i32>),
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    group_id: String,
    assignment: Assignment,
    tx: UnboundedSender<Result<ReceivedMessage>>,
}

#[derive(Debug, Default)]
struct TopicLog {
    partitions: Vec<Vec<ReceivedMessage>>,
    subscribers: Vec<Subscriber>,
}

impl TopicLog {
    fn with_partitions(count: i32) -> Self {
        Self {
            partitions: (0..count).map(|_| Vec::new()).collect(),
            subscribers: Vec::new(),
        }
    }

    fn partition_count(&self) -> i32 {
        self.partitions.len() as i32
    }

    /// Push a freshly appended record to every consumer that owns its partition
    ///
    /// Closed consumers are left out of group membership, so their share of
    /// the partitions falls to the live members.
    fn deliver(&mut self, message: &ReceivedMessage) {
        let mut targets = Vec::new();
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut closed = Vec::new();

        for (index, subscriber) in self.subscribers.iter().enumerate() {
            if subscriber.tx.is_closed() {
                closed.push(subscriber.id);
                continue;
            }
            match &subscriber.assignment {
                Assignment::Manual(partitions) => {
                    if partitions.contains(&message.partition) {
                        targets.push(index);
                    }
                }
                Assignment::Group => {
                    groups
                        .entry(subscriber.group_id.as_str())
                        .or_default()
                        .push(index);
                }
            }
        }

        for members in groups.values() {
            targets.push(members[message.partition as usize % members.len()]);
        }

        for index in targets {
            let subscriber = &self.subscribers[index];
            if subscriber.tx.send(Ok(message.clone())).is_err() {
                closed.push(subscriber.id);
            }
        }

        if !closed.is_empty() {
            debug!(
                "Dropping {} closed consumer(s) from topic '{}'",
                closed.len(),
                message.topic
            );
            self.subscribers.retain(|s| !closed.contains(&s.id));
        }
    }
}

/// Simulated broker holding partitioned logs in memory
#[derive(Debug)]
pub struct InMemoryBroker {
    topics: RwLock<HashMap<String, TopicLog>>,
    reachable: AtomicBool,
    next_subscriber_id: AtomicU64,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Create an empty, reachable broker
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            next_subscriber_id: AtomicU64::new(0),
        }
    }

    /// Create a topic; an existing topic is left untouched
    pub fn create_topic(&self, name: &str, partitions: i32) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DemoError::InvalidArgument(
                "topic name must not be empty".to_string(),
            ));
        }
        if partitions <= 0 {
            return Err(DemoError::InvalidArgument(format!(
                "topic '{}' needs at least one partition, got {}",
                name, partitions
            )));
        }

        let mut topics = self.topics.write();
        match topics.get(name) {
            Some(existing) => {
                if existing.partition_count() < partitions {
                    warn!(
                        "Topic '{}' already exists with {} partitions ({} requested)",
                        name,
                        existing.partition_count(),
                        partitions
                    );
                }
            }
            None => {
                info!("Created topic '{}' with {} partitions", name, partitions);
                topics.insert(name.to_string(), TopicLog::with_partitions(partitions));
            }
        }
        Ok(())
    }

    /// Simulate the broker going away (or coming back)
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Partition count of a topic, None if it does not exist
    pub fn partition_count(&self, topic: &str) -> Option<i32> {
        self.topics.read().get(topic).map(TopicLog::partition_count)
    }

    /// Payloads stored in one partition, in log order
    pub fn payloads(&self, topic: &str, partition: i32) -> Vec<String> {
        self.topics
            .read()
            .get(topic)
            .and_then(|log| log.partitions.get(partition as usize))
            .map(|records| records.iter().map(|r| r.payload.clone()).collect())
            .unwrap_or_default()
    }

    /// Full records stored in one partition, in log order
    pub fn records(&self, topic: &str, partition: i32) -> Vec<ReceivedMessage> {
        self.topics
            .read()
            .get(topic)
            .and_then(|log| log.partitions.get(partition as usize))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of live consumers attached to a topic
    pub fn consumer_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map(|log| log.subscribers.iter().filter(|s| !s.tx.is_closed()).count())
            .unwrap_or(0)
    }

    fn check_reachable(&self) -> Result<()> {
        if self.is_reachable() {
            Ok(())
        } else {
            Err(DemoError::BrokerUnavailable(
                "simulated broker is unreachable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, message: &OutboundMessage) -> Result<SendResult> {
        if !self.is_reachable() {
            return Err(DemoError::Publish {
                topic: message.topic.clone(),
                partition: message.partition.unwrap_or(-1),
                error: "broker transport failure: connection refused".to_string(),
            });
        }

        let mut topics = self.topics.write();
        let log = topics
            .get_mut(&message.topic)
            .ok_or_else(|| DemoError::UnknownTopic(message.topic.clone()))?;

        let partition = compute_partition(
            message.key.as_deref().map(str::as_bytes),
            log.partition_count(),
            message.partition,
        );
        if partition < 0 || partition >= log.partition_count() {
            return Err(DemoError::UnknownPartition {
                topic: message.topic.clone(),
                partition,
            });
        }

        let offset = log.partitions[partition as usize].len() as i64;
        let received = ReceivedMessage {
            topic: message.topic.clone(),
            partition,
            offset,
            key: message.key.clone(),
            payload: message.payload.clone(),
            headers: message.headers.clone(),
        };
        log.partitions[partition as usize].push(received.clone());
        log.deliver(&received);

        debug!(
            "Appended to {}[{}] at offset {}",
            message.topic, partition, offset
        );
        Ok(SendResult { partition, offset })
    }

    async fn open_consumer(&self, request: ConsumerRequest) -> Result<DeliveryStream> {
        self.check_reachable()?;

        let mut topics = self.topics.write();

        // Validate everything before attaching anywhere
        for topic in request.subscription.topics() {
            let log = topics
                .get(topic)
                .ok_or_else(|| DemoError::UnknownTopic(topic.to_string()))?;
            if let Subscription::Partitions { partitions, .. } = &request.subscription {
                if partitions.is_empty() {
                    return Err(DemoError::InvalidArgument(format!(
                        "listener '{}' is bound to no partitions of '{}'",
                        request.listener, topic
                    )));
                }
                if let Some(bad) = partitions
                    .iter()
                    .find(|p| **p < 0 || **p >= log.partition_count())
                {
                    return Err(DemoError::UnknownPartition {
                        topic: topic.to_string(),
                        partition: *bad,
                    });
                }
            }
        }

        let (tx, rx) = unbounded_channel();
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let assignment = match &request.subscription {
            Subscription::Topics(_) => Assignment::Group,
            Subscription::Partitions { partitions, .. } => Assignment::Manual(partitions.clone()),
        };

        for topic in request.subscription.topics() {
            if let Some(log) = topics.get_mut(topic) {
                log.subscribers.push(Subscriber {
                    id,
                    group_id: request.group_id.clone(),
                    assignment: assignment.clone(),
                    tx: tx.clone(),
                });
            }
        }

        info!(
            "Consumer for listener '{}' joined group '{}' on {:?}",
            request.listener, request.group_id, request.subscription
        );
        Ok(rx)
    }

    async fn health_check(&self) -> Result<()> {
        self.check_reachable()
    }

    async fn ensure_topics(&self, topics: &[TopicSpec]) -> Result<()> {
        self.check_reachable()?;
        for spec in topics {
            self.create_topic(&spec.name, spec.partitions)?;
        }
        Ok(())
    }

    fn flush(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
