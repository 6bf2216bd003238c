//! Config and broker fixtures for unit tests

use std::sync::Arc;

use crate::config::{BrokerMode, Config};
use crate::kafka::memory::InMemoryBroker;

/// Returns a Config pointed at the simulated broker with a short latch timeout
pub fn mock_config() -> Config {
    Config {
        broker_mode: BrokerMode::Memory,
        latch_timeout_ms: 2_000,
        ..Config::default()
    }
}

/// Simulated broker with the demo topics already created
pub fn demo_broker(config: &Config) -> Arc<InMemoryBroker> {
    let broker = Arc::new(InMemoryBroker::new());
    for topic in config.topics() {
        broker
            .create_topic(&topic.name, topic.partitions)
            .expect("demo topics are valid");
    }
    broker
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_config_defaults() {
        let config = mock_config();
        assert_eq!(config.broker_mode, BrokerMode::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_demo_broker_has_topics() {
        let config = mock_config();
        let broker = demo_broker(&config);
        assert_eq!(broker.partition_count("topic1"), Some(1));
        assert_eq!(broker.partition_count("partitioned"), Some(5));
        assert_eq!(broker.partition_count("filtered"), Some(1));
    }
}
