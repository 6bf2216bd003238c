//! kafka_demo: publish/subscribe demonstration over Kafka
//!
//! A producer publishes text messages to three topics while a set of
//! listeners, each with its own consumer group, partition binding or filter,
//! receive them. The demo runner waits on delivery latches to show that
//! every listener saw what it should.
//!
//! The broker sits behind the `MessageBroker` trait: `KafkaBroker` talks to
//! a real cluster through librdkafka, `InMemoryBroker` simulates one in
//! process.

pub mod config; // Configuration (property file + environment)
pub mod demo; // Demo stages and report
pub mod kafka; // Broker seam, producer, listeners, latches

// Test utilities (only compiled in test builds)
#[cfg(test)]
mod testing;

pub use config::{BrokerMode, Config};
pub use demo::{connect_broker, DemoReport, DemoRunner, StageOutcome, StageReport};
pub use kafka::{DemoError, Result};
