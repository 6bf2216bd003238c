//! Demo error types
//!
//! One error enum covers configuration, publishing, consumption and
//! orchestration so that every layer can propagate with `?`.

use thiserror::Error;

/// Errors that can occur while producing, consuming or orchestrating
#[derive(Error, Debug)]
pub enum DemoError {
    /// Startup configuration is missing or malformed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Caller supplied an empty topic or message
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Topic does not exist on the broker
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Partition index is not valid for the topic
    #[error("Unknown partition {partition} for topic '{topic}'")]
    UnknownPartition { topic: String, partition: i32 },

    /// Broker rejected or failed to acknowledge a publish
    #[error("Failed to publish to {topic}[{partition}]: {error}")]
    Publish {
        topic: String,
        partition: i32,
        error: String,
    },

    /// Broker cannot be reached
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// Consumer-side deserialization or transport failure
    #[error("Consumer error: {0}")]
    Consumer(String),

    /// Expected deliveries did not arrive in time
    #[error("Timed out after {timeout_ms}ms waiting on latch '{latch}' ({remaining} deliveries outstanding)")]
    LatchTimeout {
        latch: String,
        remaining: usize,
        timeout_ms: u64,
    },

    /// Error reported by librdkafka
    #[error("Kafka client error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// IO error (property file access)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemoError {
    /// Whether this error is a latch timeout rather than a broker or usage failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, DemoError::LatchTimeout { .. })
    }
}

/// Result type alias for demo operations
pub type Result<T> = std::result::Result<T, DemoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_display() {
        let err = DemoError::Publish {
            topic: "partitioned".to_string(),
            partition: 7,
            error: "Local: Unknown partition".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("partitioned[7]"));
        assert!(msg.contains("Unknown partition"));
    }

    #[test]
    fn test_latch_timeout_display() {
        let err = DemoError::LatchTimeout {
            latch: "filter".to_string(),
            remaining: 1,
            timeout_ms: 10_000,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("10000ms"));
        assert!(msg.contains("'filter'"));
        assert!(msg.contains("1 deliveries outstanding"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: DemoError = io_err.into();
        assert!(format!("{}", err).contains("no such file"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_unknown_partition_display() {
        let err = DemoError::UnknownPartition {
            topic: "topic1".to_string(),
            partition: -2,
        };
        assert_eq!(format!("{}", err), "Unknown partition -2 for topic 'topic1'");
    }
}
