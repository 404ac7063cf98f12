//! Stream Service - Push-style Event Delivery
//!
//! Wraps a dialer in a background task that forwards events over an
//! mpsc channel until the first error or cancellation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::context::StreamContext;
use crate::domain::event::Event;
use crate::error::{EventError, EventResult};
use crate::ports::event_feed::{EventConnection, EventDialer};

/// Event channel capacity.
pub const EVENT_BUFFER: usize = 1024;

/// Receivers returned by [`EventService::stream`].
///
/// The error receiver yields at most one error; both close when the
/// background task ends.
pub type EventStream = (mpsc::Receiver<Event>, mpsc::Receiver<EventError>);

/// Stream facade over an [`EventDialer`].
#[derive(Clone)]
pub struct EventService {
    dialer: Arc<dyn EventDialer>,
}

impl EventService {
    pub fn new(dialer: Arc<dyn EventDialer>) -> Self {
        Self { dialer }
    }

    /// Open a connection for pull-style use.
    ///
    /// # Errors
    /// Whatever the dialer returns.
    pub async fn connect(&self, ctx: &StreamContext) -> EventResult<Box<dyn EventConnection>> {
        self.dialer.dial(ctx).await
    }

    /// Spawn the forwarding task.
    ///
    /// Ends on the first error, when `ctx` is cancelled or its deadline
    /// passes (also while blocked on a full channel), or when the event
    /// receiver is dropped. The
    /// connection is closed before both senders are dropped.
    pub fn stream(&self, ctx: &StreamContext) -> EventStream {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (err_tx, err_rx) = mpsc::channel(1);
        let dialer = Arc::clone(&self.dialer);
        let ctx = ctx.clone();

        tokio::spawn(async move {
            if let Err(e) = forward(dialer.as_ref(), &ctx, &event_tx).await {
                let _ = err_tx.try_send(e);
            }
        });

        (event_rx, err_rx)
    }
}

#[instrument(skip_all)]
async fn forward(
    dialer: &dyn EventDialer,
    ctx: &StreamContext,
    events: &mpsc::Sender<Event>,
) -> EventResult<()> {
    let connection = dialer.dial(ctx).await?;
    info!("Event stream started");

    let result = pump(connection.as_ref(), ctx, events).await;

    if let Err(e) = connection.close().await {
        warn!(error = %e, "Failed to close event connection");
    }
    match &result {
        Ok(()) => info!("Event stream stopped"),
        Err(e) => info!(error = %e, "Event stream ended"),
    }
    result
}

async fn pump(
    connection: &dyn EventConnection,
    ctx: &StreamContext,
    events: &mpsc::Sender<Event>,
) -> EventResult<()> {
    loop {
        let event = connection.recv(ctx).await?;
        tokio::select! {
            biased;
            err = ctx.done() => return Err(err),
            sent = events.send(event) => {
                if sent.is_err() {
                    debug!("Event receiver dropped");
                    return Ok(());
                }
            }
        }
    }
}
