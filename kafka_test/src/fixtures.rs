//! Test fixtures
//!
//! `Collector` is a listener handler that records payloads and counts down
//! a latch, so a test can wait for N deliveries and then inspect them.

use std::sync::Arc;
use std::time::Duration;

use kafka_demo::kafka::{DeliveryLatch, Handler, ReceivedMessage, RecordHeaders};
use parking_lot::Mutex;

/// A delivery as seen by a test listener
#[derive(Debug, Clone)]
pub struct Collected {
    pub payload: String,
    pub partition: i32,
    pub header_partition: Option<i32>,
}

/// Handler fixture: records deliveries and releases a latch
#[derive(Clone)]
pub struct Collector {
    latch: Arc<DeliveryLatch>,
    seen: Arc<Mutex<Vec<Collected>>>,
}

impl Collector {
    pub fn new(name: &str, expected: usize) -> Self {
        Self {
            latch: Arc::new(DeliveryLatch::new(name, expected)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handler(&self) -> Handler {
        let latch = self.latch.clone();
        let seen = self.seen.clone();
        Arc::new(move |message: &ReceivedMessage, headers: &RecordHeaders| {
            println!(
                "   Received '{}' from {}[{}]@{}",
                message.payload, message.topic, message.partition, message.offset
            );
            seen.lock().push(Collected {
                payload: message.payload.clone(),
                partition: message.partition,
                header_partition: headers.received_partition,
            });
            latch.count_down();
        })
    }

    /// Wait for the expected number of deliveries
    pub async fn wait(&self, timeout: Duration) -> kafka_demo::Result<()> {
        self.latch.wait(timeout).await
    }

    pub fn collected(&self) -> Vec<Collected> {
        self.seen.lock().clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.seen.lock().iter().map(|c| c.payload.clone()).collect()
    }
}
