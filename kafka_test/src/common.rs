//! Common utilities shared across E2E test modules
//!
//! Broker address, demo configuration and the test result type.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use kafka_demo::kafka::{KafkaBroker, MessageBroker};
use kafka_demo::{BrokerMode, Config};

/// Test result type alias for cleaner function signatures
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Get bootstrap servers from KAFKA_BOOTSTRAP_SERVERS or use default
pub fn get_bootstrap_servers() -> String {
    env::var("KAFKA_BOOTSTRAP_SERVERS").unwrap_or_else(|_| "localhost:9092".to_string())
}

/// Demo configuration pointed at the live broker
pub fn kafka_config() -> Config {
    Config {
        bootstrap_servers: get_bootstrap_servers(),
        broker_mode: BrokerMode::Kafka,
        latch_timeout_ms: TEST_TIMEOUT.as_millis() as u64,
        ..Config::default()
    }
}

/// Kafka-backed broker for `config`
pub fn create_broker(config: &Config) -> Result<Arc<dyn MessageBroker>, Box<dyn std::error::Error>> {
    let broker = KafkaBroker::new(Arc::new(config.clone()))?;
    Ok(Arc::new(broker))
}

/// Extra time given to a listener to prove it receives nothing more
pub const QUIET_PERIOD: Duration = Duration::from_secs(2);

/// Default test timeout duration
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);
