// Messaging layer
//
// Everything between the demo orchestration and the broker lives here:
//
// - broker.rs:      MessageBroker trait, the seam between demo and client
// - client.rs:      KafkaBroker, the librdkafka implementation
// - memory.rs:      InMemoryBroker, an in-process simulation for tests and
//                   broker-less runs
// - producer.rs:    MessageProducer and delivery callbacks
// - listener.rs:    listener registry and per-listener dispatch tasks
// - latch.rs:       countdown latches stages wait on
// - messages.rs:    outbound/received message types and record metadata
// - partitioner.rs: key-to-partition mapping used by the simulation
//
// Data flow:
//
//   MessageProducer ──publish──> MessageBroker ──DeliveryStream──> ListenerContainer
//                                                                      │
//                                                           filter ──> handler ──> latch

pub mod broker;
pub mod client;
pub mod constants;
pub mod error;
pub mod latch;
pub mod listener;
pub mod memory;
pub mod messages;
pub mod partitioner;
pub mod producer;

// Re-export commonly used types for convenience
pub use broker::{ConsumerRequest, DeliveryStream, MessageBroker, Subscription};
pub use client::KafkaBroker;
pub use constants::*;
pub use error::{DemoError, Result};
pub use latch::DeliveryLatch;
pub use listener::{
    Handler, ListenerContainer, ListenerRegistry, ListenerSpec, ListenerStats, RecordFilter,
    StatsSnapshot,
};
pub use memory::InMemoryBroker;
pub use messages::{
    HeaderRequirement, OutboundMessage, ReceivedMessage, RecordHeaders, SendResult, TopicSpec,
};
pub use producer::{DeliveryCallback, LoggingCallback, MessageProducer, TopicNames};
