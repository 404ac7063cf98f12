//! kabu Event Feed - Library Root
//!
//! Streaming client for the kabu push-event gateway: wire codec, typed
//! events, subscription rules, reconnecting connection manager and
//! quote board. Re-exports all modules for integration tests and
//! benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod usecases;

pub use error::{EventError, EventResult};
