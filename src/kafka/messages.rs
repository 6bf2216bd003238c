// Message types exchanged with the broker
//
// OutboundMessage is what the producer hands to a broker, ReceivedMessage is
// what a listener gets back. Both carry UTF-8 text payloads; the wire format
// belongs to the client library.

use super::error::{DemoError, Result};

/// A message to be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Target topic
    pub topic: String,
    /// Explicit partition (None = let the partitioner decide)
    pub partition: Option<i32>,
    /// Optional key, used for partition assignment when no partition is given
    pub key: Option<String>,
    /// Text payload
    pub payload: String,
    /// Application headers
    pub headers: Vec<(String, String)>,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition: None,
            key: None,
            payload: payload.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Reject empty topics and payloads before anything reaches the broker
    ///
    /// Partition validity is the broker's call and is not checked here.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(DemoError::InvalidArgument(
                "topic name must not be empty".to_string(),
            ));
        }
        if self.payload.is_empty() {
            return Err(DemoError::InvalidArgument(format!(
                "message for topic '{}' must not be empty",
                self.topic
            )));
        }
        Ok(())
    }
}

/// Acknowledgment of a successful publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendResult {
    /// Partition the message was appended to
    pub partition: i32,
    /// Committed offset within that partition
    pub offset: i64,
}

/// A message delivered to a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: String,
    pub headers: Vec<(String, String)>,
}

impl ReceivedMessage {
    /// Look up an application header by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Which record metadata a listener wants extracted alongside the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderRequirement {
    /// Payload only
    #[default]
    None,
    /// The partition id the message arrived on
    Partition,
    /// Partition, offset, topic and key
    All,
}

/// Received-record metadata handed to a listener, per its `HeaderRequirement`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordHeaders {
    pub received_partition: Option<i32>,
    pub received_offset: Option<i64>,
    pub received_topic: Option<String>,
    pub received_key: Option<String>,
}

impl RecordHeaders {
    /// Extract the requested metadata from a delivered message
    pub fn extract(message: &ReceivedMessage, requirement: HeaderRequirement) -> Self {
        match requirement {
            HeaderRequirement::None => Self::default(),
            HeaderRequirement::Partition => Self {
                received_partition: Some(message.partition),
                ..Self::default()
            },
            HeaderRequirement::All => Self {
                received_partition: Some(message.partition),
                received_offset: Some(message.offset),
                received_topic: Some(message.topic.clone()),
                received_key: message.key.clone(),
            },
        }
    }
}

/// A topic the demo expects to exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication: i32,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>, partitions: i32) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication: super::constants::DEFAULT_REPLICATION_FACTOR,
        }
    }
}
