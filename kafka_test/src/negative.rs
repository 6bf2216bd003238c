//! Expected failure tests
//!
//! Publishing to an unreachable broker, and waiting on deliveries that
//! never come.

use std::time::Duration;

use kafka_demo::kafka::{
    DeliveryCallback, DeliveryLatch, MessageProducer, OutboundMessage, SendResult, TopicNames,
};
use kafka_demo::DemoError;
use parking_lot::Mutex;

use crate::assertions::assert_equal;
use crate::common::{create_broker, kafka_config, TestResult};

#[derive(Default)]
struct OutcomeCounter {
    successes: Mutex<usize>,
    failures: Mutex<Vec<String>>,
}

impl DeliveryCallback for OutcomeCounter {
    fn on_success(&self, _message: &OutboundMessage, _result: &SendResult) {
        *self.successes.lock() += 1;
    }

    fn on_failure(&self, _message: &OutboundMessage, error: &DemoError) {
        self.failures.lock().push(error.to_string());
    }
}

/// A publish to a port nobody listens on reports failure only
pub async fn test_connection_refused() -> TestResult {
    println!("=== Test: Connection Refused ===\n");

    let mut config = kafka_config();
    config.bootstrap_servers = "localhost:19999".to_string();
    config.message_timeout_ms = 1_000;
    let broker = create_broker(&config)?;

    let health = broker.health_check().await;
    assert_equal("Health check failed", true, health.is_err())?;

    let producer = MessageProducer::new(broker, TopicNames::from_config(&config));
    let callback = OutcomeCounter::default();
    let result = producer
        .send_with_callback(OutboundMessage::new("test-topic", "test"), &callback)
        .await;

    match &result {
        Err(e) => println!("   Expected failure occurred: {}", e),
        Ok(sent) => println!("   Unexpected success at offset {}", sent.offset),
    }
    assert_equal("Publish failed", true, result.is_err())?;
    assert_equal("Success callbacks", 0, *callback.successes.lock())?;
    assert_equal("Failure callbacks", 1, callback.failures.lock().len())?;

    println!("\n   Test PASSED (graceful failure handling)\n");
    Ok(())
}

/// Waiting past the timeout yields an explicit LatchTimeout
pub async fn test_latch_timeout_is_explicit() -> TestResult {
    println!("=== Test: Latch Timeout ===\n");

    let latch = DeliveryLatch::new("never", 2);
    latch.count_down();

    match latch.wait(Duration::from_millis(200)).await {
        Err(DemoError::LatchTimeout { remaining, .. }) => {
            assert_equal("Remaining deliveries", 1, remaining)?;
        }
        other => return Err(format!("expected LatchTimeout, got {:?}", other).into()),
    }

    println!("\n   Test PASSED\n");
    Ok(())
}
