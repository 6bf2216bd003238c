//! Testing utilities for kafka_demo
//!
//! Shared by the unit tests of the library modules. Only compiled for tests.
//!
//! # Organization
//! - `mocks.rs` - Recording implementations of callbacks and handlers
//! - `helpers.rs` - Config and broker fixtures

#![cfg(test)]

pub mod helpers;
pub mod mocks;

pub use helpers::{demo_broker, mock_config};
pub use mocks::{RecordingCallback, RecordingHandler};
