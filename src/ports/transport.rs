//! Transport Port - Socket and Endpoint Interfaces
//!
//! The connection manager never touches a concrete WebSocket client.
//! It asks an `EndpointProvider` for the base event URL, opens sockets
//! through an `EventTransport` and reads whole messages from the
//! returned `EventSocket`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::EventResult;

/// One message read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketMessage {
  /// Text frame payload.
  Text(String),
  /// Binary frame payload.
  Binary(Vec<u8>),
  /// Ping / pong / raw frames; carries no event.
  Control,
}

impl SocketMessage {
  /// Payload bytes for data frames, `None` for control frames.
  pub fn payload(&self) -> Option<&[u8]> {
    match self {
      Self::Text(text) => Some(text.as_bytes()),
      Self::Binary(data) => Some(data),
      Self::Control => None,
    }
  }
}

/// Source of the base streaming URL.
///
/// Usually backed by the login session, which learns the URL from the
/// token response.
#[async_trait]
pub trait EndpointProvider: Send + Sync + 'static {
  /// Current base event URL.
  ///
  /// Fails with `EndpointUnavailable` when no URL is known yet.
  async fn event_url(&self) -> EventResult<String>;
}

/// Opens streaming sockets.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
  /// Perform the handshake against `url`, bounded by `timeout`.
  ///
  /// Failures are reported as `Connect`.
  async fn open(&self, url: &str, timeout: Duration) -> EventResult<Box<dyn EventSocket>>;
}

/// A live streaming socket.
#[async_trait]
pub trait EventSocket: Send + 'static {
  /// Next message. Stream end and transport errors are `Read`.
  async fn read(&mut self) -> EventResult<SocketMessage>;

  /// Send a normal-closure frame and shut the socket down.
  async fn close_normal(&mut self) -> EventResult<()>;
}
