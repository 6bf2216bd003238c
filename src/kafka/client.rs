//! Kafka broker backed by librdkafka
//!
//! Publishing goes through one shared `FutureProducer`. Every listener gets
//! its own `StreamConsumer`, either subscribed (group-managed) or assigned to
//! explicit partitions, and a pump task that forwards converted records to
//! the listener's delivery stream until the stream is dropped.
//!
//! SASL and SSL settings are applied to producers, consumers and the admin
//! client alike.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::TopicPartitionList;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, warn};

use super::broker::{ConsumerRequest, DeliveryStream, MessageBroker, Subscription};
use super::constants::ADMIN_OPERATION_TIMEOUT_MS;
use super::error::{DemoError, Result};
use super::messages::{OutboundMessage, ReceivedMessage, SendResult, TopicSpec};
use crate::config::Config;

/// Client settings shared by producers, consumers and the admin client
pub fn base_client_config(config: &Config) -> ClientConfig {
    let mut client_config = ClientConfig::new();

    client_config.set("bootstrap.servers", &config.bootstrap_servers);
    client_config.set("client.id", &config.client_id);
    client_config.set("security.protocol", &config.security_protocol);

    if config.uses_sasl() {
        client_config.set("sasl.mechanism", &config.sasl_mechanism);

        if !config.sasl_username.is_empty() {
            client_config.set("sasl.username", &config.sasl_username);
        }

        if !config.sasl_password.is_empty() {
            client_config.set("sasl.password", &config.sasl_password);
        }
    }

    if config.uses_ssl() {
        client_config.set("ssl.endpoint.identification.algorithm", "https");
    }

    client_config
}

/// Consumer settings for one listener
pub fn consumer_client_config(config: &Config, request: &ConsumerRequest) -> ClientConfig {
    let mut client_config = base_client_config(config);
    client_config
        .set("group.id", &request.group_id)
        .set(
            "client.id",
            format!("{}-{}", config.client_id, request.listener),
        )
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", &config.auto_offset_reset)
        .set("session.timeout.ms", config.session_timeout_ms.to_string());
    client_config
}

/// Broker talking to a Kafka cluster
pub struct KafkaBroker {
    producer: FutureProducer,
    config: Arc<Config>,
}

impl KafkaBroker {
    /// Create the shared producer
    ///
    /// librdkafka connects lazily, so an unreachable cluster is only
    /// noticed on the first publish or metadata request.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let mut client_config = base_client_config(&config);
        client_config.set("message.timeout.ms", config.message_timeout_ms.to_string());
        client_config.set("acks", "all");

        let producer: FutureProducer = client_config.create()?;
        info!(
            "Kafka producer created for {} ({})",
            config.bootstrap_servers, config.security_protocol
        );

        Ok(Self { producer, config })
    }

    fn warn_on_partition_shortfall(
        &self,
        admin: &AdminClient<DefaultClientContext>,
        topics: &[TopicSpec],
    ) {
        let timeout = Duration::from_millis(ADMIN_OPERATION_TIMEOUT_MS);
        for spec in topics {
            match admin.inner().fetch_metadata(Some(&spec.name), timeout) {
                Ok(metadata) => {
                    let actual = metadata
                        .topics()
                        .iter()
                        .find(|t| t.name() == spec.name)
                        .map(|t| t.partitions().len() as i32)
                        .unwrap_or(0);
                    if actual < spec.partitions {
                        warn!(
                            "Topic '{}' has {} partitions, {} expected",
                            spec.name, actual, spec.partitions
                        );
                    }
                }
                Err(e) => warn!("Could not read metadata for '{}': {}", spec.name, e),
            }
        }
    }
}

/// Copy a consumed record out of librdkafka's buffer
fn to_received(message: &BorrowedMessage<'_>) -> Result<ReceivedMessage> {
    let payload = match message.payload_view::<str>() {
        None => String::new(),
        Some(Ok(text)) => text.to_string(),
        Some(Err(e)) => {
            return Err(DemoError::Consumer(format!(
                "payload at {}[{}]@{} is not UTF-8: {}",
                message.topic(),
                message.partition(),
                message.offset(),
                e
            )))
        }
    };

    let key = message
        .key()
        .map(|k| String::from_utf8_lossy(k).into_owned());

    let headers = message
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|h| {
                    let value = h
                        .value
                        .map(|v| String::from_utf8_lossy(v).into_owned())
                        .unwrap_or_default();
                    (h.key.to_string(), value)
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ReceivedMessage {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key,
        payload,
        headers,
    })
}

#[async_trait]
impl MessageBroker for KafkaBroker {
    async fn publish(&self, message: &OutboundMessage) -> Result<SendResult> {
        let mut record = FutureRecord::to(&message.topic).payload(message.payload.as_str());

        if let Some(key) = &message.key {
            record = record.key(key.as_str());
        }

        if let Some(partition) = message.partition {
            record = record.partition(partition);
        }

        if !message.headers.is_empty() {
            let headers = message
                .headers
                .iter()
                .fold(OwnedHeaders::new(), |headers, (name, value)| {
                    headers.insert(Header {
                        key: name,
                        value: Some(value.as_str()),
                    })
                });
            record = record.headers(headers);
        }

        let timeout = Timeout::After(Duration::from_millis(self.config.message_timeout_ms));

        let (partition, offset) = self
            .producer
            .send(record, timeout)
            .await
            .map_err(|(err, _)| DemoError::Publish {
                topic: message.topic.clone(),
                partition: message.partition.unwrap_or(-1),
                error: err.to_string(),
            })?;

        Ok(SendResult { partition, offset })
    }

    async fn open_consumer(&self, request: ConsumerRequest) -> Result<DeliveryStream> {
        let consumer: StreamConsumer = consumer_client_config(&self.config, &request).create()?;

        match &request.subscription {
            Subscription::Topics(topics) => {
                let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
                consumer.subscribe(&topics)?;
            }
            Subscription::Partitions { topic, partitions } => {
                let mut assignment = TopicPartitionList::new();
                for partition in partitions {
                    assignment.add_partition(topic, *partition);
                }
                consumer.assign(&assignment)?;
            }
        }

        info!(
            "Consumer for listener '{}' joined group '{}' on {:?}",
            request.listener, request.group_id, request.subscription
        );

        let (tx, rx) = unbounded_channel();
        let listener = request.listener;
        tokio::spawn(async move {
            loop {
                let delivery = tokio::select! {
                    _ = tx.closed() => break,
                    received = consumer.recv() => match received {
                        Ok(message) => to_received(&message),
                        Err(e) => Err(DemoError::Kafka(e)),
                    },
                };
                if tx.send(delivery).is_err() {
                    break;
                }
            }
            debug!("Consumer pump for listener '{}' stopped", listener);
        });

        Ok(rx)
    }

    /// At least one broker has to answer a metadata request
    async fn health_check(&self) -> Result<()> {
        let timeout = Duration::from_millis(ADMIN_OPERATION_TIMEOUT_MS);
        let metadata = self
            .producer
            .client()
            .fetch_metadata(None, timeout)
            .map_err(|e| DemoError::BrokerUnavailable(format!("Failed to fetch metadata: {}", e)))?;

        if metadata.brokers().is_empty() {
            return Err(DemoError::BrokerUnavailable(
                "metadata response listed no brokers".to_string(),
            ));
        }
        debug!("Metadata lists {} broker(s)", metadata.brokers().len());
        Ok(())
    }

    async fn ensure_topics(&self, topics: &[TopicSpec]) -> Result<()> {
        let admin: AdminClient<DefaultClientContext> = base_client_config(&self.config).create()?;
        let options = AdminOptions::new()
            .operation_timeout(Some(Duration::from_millis(ADMIN_OPERATION_TIMEOUT_MS)));

        let new_topics: Vec<NewTopic> = topics
            .iter()
            .map(|t| NewTopic::new(&t.name, t.partitions, TopicReplication::Fixed(t.replication)))
            .collect();

        for result in admin.create_topics(&new_topics, &options).await? {
            match result {
                Ok(name) => info!("Created topic '{}'", name),
                Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    debug!("Topic '{}' already exists", name)
                }
                Err((name, code)) => {
                    warn!("Failed to create topic '{}': {}", name, code);
                    return Err(DemoError::Kafka(KafkaError::AdminOp(code)));
                }
            }
        }

        self.warn_on_partition_shortfall(&admin, topics);
        Ok(())
    }

    fn flush(&self, timeout: Duration) -> Result<()> {
        self.producer.flush(Timeout::After(timeout))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}

impl std::fmt::Debug for KafkaBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaBroker")
            .field("bootstrap_servers", &self.config.bootstrap_servers)
            .field("security_protocol", &self.config.security_protocol)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_client_config() {
        let config = Config::default();
        let client_config = base_client_config(&config);
        assert_eq!(client_config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(client_config.get("security.protocol"), Some("PLAINTEXT"));
        assert_eq!(client_config.get("sasl.mechanism"), None);
        assert_eq!(client_config.get("ssl.endpoint.identification.algorithm"), None);
    }

    #[test]
    fn test_sasl_ssl_client_config() {
        let config = Config {
            security_protocol: "SASL_SSL".to_string(),
            sasl_mechanism: "SCRAM-SHA-512".to_string(),
            sasl_username: "demo".to_string(),
            sasl_password: "secret".to_string(),
            ..Config::default()
        };
        let client_config = base_client_config(&config);
        assert_eq!(client_config.get("sasl.mechanism"), Some("SCRAM-SHA-512"));
        assert_eq!(client_config.get("sasl.username"), Some("demo"));
        assert_eq!(client_config.get("sasl.password"), Some("secret"));
        assert_eq!(
            client_config.get("ssl.endpoint.identification.algorithm"),
            Some("https")
        );
    }

    #[test]
    fn test_consumer_client_config() {
        let config = Config::default();
        let request = ConsumerRequest {
            listener: "group-foo".to_string(),
            group_id: "foo".to_string(),
            subscription: Subscription::Topics(vec!["topic1".to_string()]),
        };
        let client_config = consumer_client_config(&config, &request);
        assert_eq!(client_config.get("group.id"), Some("foo"));
        assert_eq!(client_config.get("client.id"), Some("kafka-demo-group-foo"));
        assert_eq!(client_config.get("enable.auto.commit"), Some("true"));
        assert_eq!(client_config.get("auto.offset.reset"), Some("earliest"));
    }
}
