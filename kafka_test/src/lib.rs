//! kafka_demo E2E Test Suite
//!
//! End-to-end tests running the demo's producer, listeners and runner
//! against a live Kafka broker:
//! - Test isolation via unique topic/group names
//! - Automatic topic cleanup via RAII
//! - Assertions that return errors instead of panicking
//!
//! ## Test Categories
//!
//! - **basic**: one message fanned out to three consumer groups
//! - **partition**: partition-bound listener, invalid partition
//! - **filter**: filtered listener
//! - **negative**: unreachable broker, explicit latch timeout
//! - **demo**: the full three-stage demo run
//!
//! ## Usage
//!
//! ```bash
//! KAFKA_BOOTSTRAP_SERVERS=localhost:9092 cargo run --release -p kafka_test
//! ```

// Infrastructure modules
pub mod assertions;
pub mod common;
pub mod fixtures;
pub mod setup;

// Test modules
pub mod basic;
pub mod demo;
pub mod filter;
pub mod negative;
pub mod partition;

// Re-export infrastructure
pub use assertions::*;
pub use fixtures::*;
pub use setup::TestContext;

// Re-export test functions for convenience
pub use basic::test_basic_fanout;
pub use demo::test_demo_run;
pub use filter::test_filter_discards_world;
pub use negative::{test_connection_refused, test_latch_timeout_is_explicit};
pub use partition::{test_invalid_partition_rejected, test_partition_binding};
