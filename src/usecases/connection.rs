//! Connection Manager - Single-session Event Stream with Auto-reconnect
//!
//! `EventClient` owns the endpoint/transport ports, the subscription and
//! the resume watermark. `open()` hands out at most one live
//! `StreamSession` at a time. The session hides transport failures:
//! a failed read drops the socket and reconnects with exponential
//! backoff, resuming from the highest notice number seen so far.
//!
//! Every wait (handshake, read, backoff sleep) selects against the
//! caller's context and the session's close token.

use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::backoff::ReconnectPolicy;
use super::context::StreamContext;
use crate::config::AppConfig;
use crate::domain::decoder::decode_event;
use crate::domain::event::Event;
use crate::domain::params::{SubscriptionParams, build_ws_url};
use crate::error::{EventError, EventResult};
use crate::ports::event_feed::{EventConnection, EventDialer, FeedObserver, NoopObserver};
use crate::ports::transport::{EndpointProvider, EventSocket, EventTransport};

type SharedSocket = Arc<tokio::sync::Mutex<Box<dyn EventSocket>>>;

/// Timeouts and backoff bounds for a client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub handshake_timeout: Duration,
    /// Read timeout when the caller's context has no deadline.
    pub read_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            initial_backoff: ReconnectPolicy::DEFAULT_INITIAL,
            max_backoff: ReconnectPolicy::DEFAULT_MAX,
        }
    }
}

impl ClientSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            handshake_timeout: config.api.handshake_timeout(),
            read_timeout: config.api.read_timeout(),
            initial_backoff: Duration::from_millis(config.reconnect.initial_delay_ms),
            max_backoff: Duration::from_millis(config.reconnect.max_delay_ms),
        }
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Event stream client.
///
/// Cheap to clone; clones share the session guard and the watermark.
#[derive(Clone)]
pub struct EventClient {
    endpoint: Arc<dyn EndpointProvider>,
    transport: Arc<dyn EventTransport>,
    params: SubscriptionParams,
    settings: ClientSettings,
    observer: Arc<dyn FeedObserver>,
    active: Arc<Mutex<bool>>,
    last_event_no: Arc<AtomicI64>,
    connects: Arc<AtomicU64>,
}

impl EventClient {
    pub fn new(
        endpoint: Arc<dyn EndpointProvider>,
        transport: Arc<dyn EventTransport>,
        params: SubscriptionParams,
    ) -> Self {
        Self {
            endpoint,
            transport,
            params,
            settings: ClientSettings::default(),
            observer: Arc::new(NoopObserver),
            active: Arc::new(Mutex::new(false)),
            last_event_no: Arc::new(AtomicI64::new(0)),
            connects: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FeedObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub const fn params(&self) -> &SubscriptionParams {
        &self.params
    }

    /// Highest `p_ENO` delivered by any session of this client.
    pub fn last_event_no(&self) -> i64 {
        self.last_event_no.load(Ordering::SeqCst)
    }

    /// Whether a session is currently open.
    pub fn is_active(&self) -> bool {
        *self.active.lock()
    }

    /// Open the single session and perform the initial connect.
    ///
    /// # Errors
    /// - `SessionActive` when another session is open.
    /// - Whatever ends the initial connect loop (cancellation, deadline,
    ///   endpoint or parameter failures). The guard is released first.
    pub async fn open(&self, ctx: &StreamContext) -> EventResult<StreamSession> {
        {
            let mut active = self.active.lock();
            if *active {
                return Err(EventError::SessionActive);
            }
            *active = true;
        }

        let session = StreamSession {
            client: self.clone(),
            socket: Mutex::new(None),
            closed: CancellationToken::new(),
            released: AtomicBool::new(false),
            state: Mutex::new(ConnectionState::Idle),
            backoff: Mutex::new(ReconnectPolicy::new(
                self.settings.initial_backoff,
                self.settings.max_backoff,
            )),
        };

        // dropping the session on failure releases the guard
        session.reconnect(ctx).await?;
        Ok(session)
    }

    async fn stream_url(&self) -> EventResult<String> {
        let base = self.endpoint.event_url().await?;
        let mut params = self.params.clone();
        if params.eno == 0 {
            let seen = self.last_event_no();
            if seen > 0 {
                params.eno = seen;
            }
        }
        build_ws_url(&base, &params)
    }
}

#[async_trait]
impl EventDialer for EventClient {
    async fn dial(&self, ctx: &StreamContext) -> EventResult<Box<dyn EventConnection>> {
        Ok(Box::new(self.open(ctx).await?))
    }
}

/// One live session of an [`EventClient`].
pub struct StreamSession {
    client: EventClient,
    socket: Mutex<Option<SharedSocket>>,
    closed: CancellationToken,
    released: AtomicBool,
    state: Mutex<ConnectionState>,
    backoff: Mutex<ReconnectPolicy>,
}

impl StreamSession {
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    fn current_socket(&self) -> Option<SharedSocket> {
        self.socket.lock().clone()
    }

    /// Clear the slot if it still holds `socket`.
    fn drop_socket(&self, socket: &SharedSocket) -> bool {
        let mut slot = self.socket.lock();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, socket)) {
            *slot = None;
            return true;
        }
        false
    }

    /// Connect until a socket is installed. Transport failures are
    /// retried forever with backoff.
    #[instrument(skip_all)]
    async fn reconnect(&self, ctx: &StreamContext) -> EventResult<()> {
        loop {
            if self.closed.is_cancelled() {
                return Err(EventError::Closed);
            }
            ctx.check()?;
            self.set_state(ConnectionState::Connecting);

            let url = tokio::select! {
                biased;
                () = self.closed.cancelled() => return Err(EventError::Closed),
                err = ctx.done() => return Err(err),
                url = self.client.stream_url() => url?,
            };
            debug!(url = %url, "Connecting to event stream");

            let attempt = tokio::select! {
                biased;
                () = self.closed.cancelled() => return Err(EventError::Closed),
                err = ctx.done() => return Err(err),
                res = self.client.transport.open(&url, self.client.settings.handshake_timeout) => res,
            };

            match attempt {
                Ok(socket) => {
                    let socket: SharedSocket = Arc::new(tokio::sync::Mutex::new(socket));
                    *self.socket.lock() = Some(Arc::clone(&socket));

                    if self.closed.is_cancelled() {
                        // close() ran while the handshake was in flight
                        self.drop_socket(&socket);
                        let _ = socket.lock().await.close_normal().await;
                        return Err(EventError::Closed);
                    }

                    self.backoff.lock().reset();
                    self.set_state(ConnectionState::Connected);
                    let reconnect = self.client.connects.fetch_add(1, Ordering::SeqCst) > 0;
                    self.client.observer.on_connected(reconnect);
                    info!(
                        reconnect,
                        resume_from = self.client.last_event_no(),
                        "Event stream connected"
                    );
                    return Ok(());
                }
                Err(e) => {
                    let delay = self.backoff.lock().next_delay();
                    warn!(
                        error = %e,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Event stream connect failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        () = self.closed.cancelled() => return Err(EventError::Closed),
                        err = ctx.done() => return Err(err),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Next event from the stream.
    ///
    /// Control frames are skipped. A command outside the allow-list is
    /// delivered as `Event::Unknown`; any other decode failure is
    /// returned. Read failures and idle timeouts recycle the socket.
    ///
    /// # Errors
    /// `Closed`, `Cancelled`, `DeadlineExceeded`, connect-loop failures
    /// or decode failures.
    pub async fn recv(&self, ctx: &StreamContext) -> EventResult<Event> {
        loop {
            if self.closed.is_cancelled() {
                return Err(EventError::Closed);
            }
            let Some(socket) = self.current_socket() else {
                self.reconnect(ctx).await?;
                continue;
            };

            let idle_limit = self.client.settings.read_timeout;
            let idle = async {
                match ctx.deadline() {
                    Some(_) => pending::<()>().await,
                    None => tokio::time::sleep(idle_limit).await,
                }
            };

            let result = tokio::select! {
                biased;
                () = self.closed.cancelled() => return Err(EventError::Closed),
                err = ctx.done() => return Err(err),
                () = idle => Err(EventError::Read(format!("no message within {idle_limit:?}"))),
                res = async { socket.lock().await.read().await } => res,
            };

            match result {
                Ok(message) => {
                    let Some(payload) = message.payload() else {
                        continue;
                    };
                    return self.deliver(payload);
                }
                Err(e) => {
                    if self.closed.is_cancelled() {
                        return Err(e);
                    }
                    warn!(error = %e, transient = e.is_transient(), "Event stream read failed, reconnecting");
                    if self.drop_socket(&socket) {
                        self.client.observer.on_disconnected();
                    }
                    self.reconnect(ctx).await?;
                }
            }
        }
    }

    fn deliver(&self, payload: &[u8]) -> EventResult<Event> {
        let event = match decode_event(payload) {
            Ok(event) => event,
            Err(e) if e.is_unsupported_command() => Event::Unknown {
                raw: payload.to_vec(),
            },
            Err(e) => {
                self.client.observer.on_decode_error();
                debug!(error = %e, "Failed to decode event");
                return Err(e);
            }
        };

        let event_no = event.event_no();
        if let Some(eno) = event_no {
            self.client.last_event_no.fetch_max(eno, Ordering::SeqCst);
        }
        self.client.observer.on_event(event.kind(), event_no);
        Ok(event)
    }

    /// Close the socket with a normal-closure frame and release the
    /// session guard. Later calls are no-ops.
    ///
    /// # Errors
    /// The socket's close error, after the guard has been released.
    pub async fn close(&self) -> EventResult<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.closed.cancel();
        self.set_state(ConnectionState::Closed);

        let socket = self.socket.lock().take();
        let result = match socket {
            Some(socket) => {
                let close = async { socket.lock().await.close_normal().await };
                match tokio::time::timeout(self.client.settings.handshake_timeout, close).await {
                    Ok(res) => res,
                    Err(_) => Err(EventError::Connect("close handshake timed out".to_string())),
                }
            }
            None => Ok(()),
        };

        *self.client.active.lock() = false;
        self.client.observer.on_disconnected();
        info!("Event stream closed");
        result
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.closed.cancel();
            *self.client.active.lock() = false;
            if self.socket.get_mut().take().is_some() {
                self.client.observer.on_disconnected();
            }
        }
    }
}

#[async_trait]
impl EventConnection for StreamSession {
    async fn recv(&self, ctx: &StreamContext) -> EventResult<Event> {
        Self::recv(self, ctx).await
    }

    async fn close(&self) -> EventResult<()> {
        Self::close(self).await
    }
}
