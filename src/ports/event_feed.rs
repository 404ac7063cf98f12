//! Event Feed Port - Pull-based Event Stream Interface
//!
//! A dialer hands out connections; a connection yields decoded events
//! one at a time and hides reconnects from the caller.

use async_trait::async_trait;

use crate::domain::event::Event;
use crate::error::EventResult;
use crate::usecases::context::StreamContext;

/// Opens event connections.
#[async_trait]
pub trait EventDialer: Send + Sync + 'static {
  /// Open a new connection; at most one may be live per dialer.
  async fn dial(&self, ctx: &StreamContext) -> EventResult<Box<dyn EventConnection>>;
}

/// A live event connection.
#[async_trait]
pub trait EventConnection: Send + Sync {
  /// Next event, reconnecting transparently on transport failures.
  ///
  /// Returns `Closed` after [`close`](Self::close), and `Cancelled` or
  /// `DeadlineExceeded` when `ctx` ends first.
  async fn recv(&self, ctx: &StreamContext) -> EventResult<Event>;

  /// Close the socket and release the session. Idempotent.
  async fn close(&self) -> EventResult<()>;
}

/// Receives connection lifecycle and event notifications.
///
/// Every hook defaults to a no-op; the metrics adapter implements the
/// ones it counts.
pub trait FeedObserver: Send + Sync + 'static {
  /// Socket installed. `reconnect` is false for the first connect of a
  /// client.
  fn on_connected(&self, _reconnect: bool) {}

  /// Socket dropped or closed.
  fn on_disconnected(&self) {}

  /// Event delivered to the caller.
  fn on_event(&self, _kind: &str, _event_no: Option<i64>) {}

  /// Payload that failed to decode.
  fn on_decode_error(&self) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FeedObserver for NoopObserver {}
