//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `EndpointProvider` / `EventTransport` / `EventSocket`: socket plumbing
//! - `EventDialer` / `EventConnection`: decoded event stream
//! - `FeedObserver`: lifecycle hooks for metrics

pub mod event_feed;
pub mod transport;

pub use event_feed::{EventConnection, EventDialer, FeedObserver, NoopObserver};
pub use transport::{EndpointProvider, EventSocket, EventTransport, SocketMessage};
