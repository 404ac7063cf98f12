//! Integration Tests - Connection Manager and Stream Service
//!
//! Drives `EventClient` and `EventService` through scripted transports
//! and mock ports. Uses mockall for trait mocking and tokio::test for
//! async tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;

use kabu_event_feed::domain::command::Command;
use kabu_event_feed::domain::decoder::decode_event;
use kabu_event_feed::domain::event::Event;
use kabu_event_feed::domain::params::SubscriptionParams;
use kabu_event_feed::error::{EventError, EventResult};
use kabu_event_feed::ports::event_feed::{EventConnection, EventDialer};
use kabu_event_feed::ports::transport::{
    EndpointProvider, EventSocket, EventTransport, SocketMessage,
};
use kabu_event_feed::usecases::{
    ClientSettings, ConnectionState, EventClient, EventService, StreamContext,
};

// ---- Mock Definitions ----

mock! {
    pub Endpoint {}

    #[async_trait]
    impl EndpointProvider for Endpoint {
        async fn event_url(&self) -> EventResult<String>;
    }
}

mock! {
    pub Dialer {}

    #[async_trait]
    impl EventDialer for Dialer {
        async fn dial(&self, ctx: &StreamContext) -> EventResult<Box<dyn EventConnection>>;
    }
}

// ---- Fakes ----

type Script = Vec<EventResult<SocketMessage>>;

/// Socket that replays a script, then waits forever.
struct ScriptedSocket {
    script: VecDeque<EventResult<SocketMessage>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl EventSocket for ScriptedSocket {
    async fn read(&mut self) -> EventResult<SocketMessage> {
        match self.script.pop_front() {
            Some(message) => message,
            None => std::future::pending().await,
        }
    }

    async fn close_normal(&mut self) -> EventResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Transport that hands out one scripted socket (or failure) per open
/// and records every URL it was asked for.
#[derive(Default)]
struct FakeTransport {
    attempts: Mutex<VecDeque<EventResult<Script>>>,
    urls: Mutex<Vec<String>>,
    closed: Arc<AtomicBool>,
}

impl FakeTransport {
    fn with(attempts: Vec<EventResult<Script>>) -> Arc<Self> {
        Arc::new(Self {
            attempts: Mutex::new(attempts.into()),
            ..Default::default()
        })
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventTransport for FakeTransport {
    async fn open(&self, url: &str, _timeout: Duration) -> EventResult<Box<dyn EventSocket>> {
        self.urls.lock().unwrap().push(url.to_string());
        let attempt = self.attempts.lock().unwrap().pop_front();
        let script = attempt.unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(Box::new(ScriptedSocket {
            script: script.into(),
            closed: Arc::clone(&self.closed),
        }))
    }
}

/// Connection that yields scripted results, then waits for `ctx`.
struct ScriptedConnection {
    results: Mutex<VecDeque<EventResult<Event>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl EventConnection for ScriptedConnection {
    async fn recv(&self, ctx: &StreamContext) -> EventResult<Event> {
        let next = self.results.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => Err(ctx.done().await),
        }
    }

    async fn close(&self) -> EventResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn endpoint() -> Arc<MockEndpoint> {
    let mut endpoint = MockEndpoint::new();
    endpoint
        .expect_event_url()
        .returning(|| Ok("wss://push.example.test/kabusapi/event".to_string()));
    Arc::new(endpoint)
}

fn text(raw: &str) -> EventResult<SocketMessage> {
    Ok(SocketMessage::Text(raw.to_string()))
}

fn client(transport: Arc<FakeTransport>, params: SubscriptionParams) -> EventClient {
    EventClient::new(endpoint(), transport, params).with_settings(ClientSettings {
        handshake_timeout: Duration::from_secs(1),
        read_timeout: Duration::from_secs(60),
        initial_backoff: Duration::from_secs(1),
        max_backoff: Duration::from_secs(30),
    })
}

// ---- Connection Manager ----

#[tokio::test]
async fn test_concurrent_open_allows_single_session() {
    let transport = FakeTransport::with(Vec::new());
    let client = client(Arc::clone(&transport), SubscriptionParams::new());
    let ctx = StreamContext::new();

    let (a, b) = tokio::join!(client.open(&ctx), client.open(&ctx));
    let (session, rejected) = match (a, b) {
        (Ok(session), Err(e)) | (Err(e), Ok(session)) => (session, e),
        (a, b) => panic!("expected exactly one session, got {:?} / {:?}", a.is_ok(), b.is_ok()),
    };
    assert_eq!(rejected, EventError::SessionActive);
    assert_eq!(session.state(), ConnectionState::Connected);

    session.close().await.unwrap();
    assert!(transport.closed.load(Ordering::SeqCst));
    assert!(!client.is_active());

    let reopened = client.open(&ctx).await.unwrap();
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_resumes_from_last_event_no() {
    let transport = FakeTransport::with(vec![
        Ok(vec![
            text("p_cmd\x02SS\x01p_ENO\x0241"),
            text("p_cmd\x02SS\x01p_ENO\x0242"),
            Err(EventError::Read("connection reset".to_string())),
        ]),
        Ok(vec![text("p_cmd\x02KP")]),
    ]);
    let client = client(Arc::clone(&transport), SubscriptionParams::new());
    let ctx = StreamContext::new();
    let session = client.open(&ctx).await.unwrap();

    assert_eq!(session.recv(&ctx).await.unwrap().event_no(), Some(41));
    assert_eq!(session.recv(&ctx).await.unwrap().event_no(), Some(42));
    assert_eq!(session.recv(&ctx).await.unwrap().kind(), "KP");

    let urls = transport.urls();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].contains("p_eno=0"), "{}", urls[0]);
    assert!(urls[1].contains("p_eno=42"), "{}", urls[1]);
    assert_eq!(client.last_event_no(), 42);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_explicit_eno_is_not_overridden() {
    let transport = FakeTransport::with(vec![
        Ok(vec![
            text("p_cmd\x02SS\x01p_ENO\x0299"),
            Err(EventError::Read("eof".to_string())),
        ]),
        Ok(Vec::new()),
    ]);
    let client = client(Arc::clone(&transport), SubscriptionParams::new().with_eno(5));
    let ctx = StreamContext::new();
    let session = client.open(&ctx).await.unwrap();

    session.recv(&ctx).await.unwrap();
    let next = session.recv(&ctx.with_timeout(Duration::from_millis(50))).await;
    assert_eq!(next.unwrap_err(), EventError::DeadlineExceeded);

    let urls = transport.urls();
    assert_eq!(urls.len(), 2);
    assert!(urls.iter().all(|url| url.contains("p_eno=5")));
}

#[tokio::test(start_paused = true)]
async fn test_connect_failures_back_off_and_retry() {
    let transport = FakeTransport::with(vec![
        Err(EventError::Connect("refused".to_string())),
        Err(EventError::Connect("refused".to_string())),
        Ok(vec![text("p_cmd\x02KP")]),
    ]);
    let client = client(Arc::clone(&transport), SubscriptionParams::new());
    let ctx = StreamContext::new();

    let started = tokio::time::Instant::now();
    let session = client.open(&ctx).await.unwrap();
    // 1s + 2s of backoff
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(transport.urls().len(), 3);
    assert_eq!(session.recv(&ctx).await.unwrap().kind(), "KP");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_backoff() {
    let attempts = (0..100)
        .map(|_| Err(EventError::Connect("refused".to_string())))
        .collect();
    let transport = FakeTransport::with(attempts);
    let client = client(Arc::clone(&transport), SubscriptionParams::new());
    let ctx = StreamContext::new();

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        canceller.cancel();
    });

    let err = client.open(&ctx).await.err();
    assert_eq!(err, Some(EventError::Cancelled));
    assert!(!client.is_active());
}

#[tokio::test]
async fn test_endpoint_failure_is_not_retried() {
    let mut endpoint = MockEndpoint::new();
    endpoint
        .expect_event_url()
        .times(1)
        .returning(|| Err(EventError::EndpointUnavailable("not logged in".to_string())));
    let transport = FakeTransport::with(Vec::new());
    let client = EventClient::new(Arc::new(endpoint), transport.clone(), SubscriptionParams::new());

    let err = client.open(&StreamContext::new()).await.err();
    assert!(matches!(err, Some(EventError::EndpointUnavailable(_))));
    assert!(transport.urls().is_empty());
    assert!(!client.is_active());
}

#[tokio::test]
async fn test_unsupported_command_becomes_unknown() {
    let transport = FakeTransport::with(vec![Ok(vec![text("p_cmd\x02ZZ\x01p_no\x021")])]);
    let client = client(transport, SubscriptionParams::new());
    let ctx = StreamContext::new();
    let session = client.open(&ctx).await.unwrap();

    match session.recv(&ctx).await.unwrap() {
        Event::Unknown { raw } => assert_eq!(raw, b"p_cmd\x02ZZ\x01p_no\x021"),
        other => panic!("expected Unknown, got {other:?}"),
    }
}

#[tokio::test]
async fn test_board_subscription_url() {
    let transport = FakeTransport::with(Vec::new());
    let params = SubscriptionParams::board([("7203", "00"), ("6758", "00")]);
    assert!(params.wants(&Command::Fd));
    let client = client(Arc::clone(&transport), params);
    let session = client.open(&StreamContext::new()).await.unwrap();

    let url = &transport.urls()[0];
    assert!(url.contains("p_rid=22&p_board_no=1000&p_gyou_no=1,2"), "{url}");
    assert!(url.contains("p_issue_code=7203,6758&p_mkt_code=00,00"), "{url}");
    assert!(!url.contains("%2C"));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_close_unblocks_pending_recv() {
    let transport = FakeTransport::with(Vec::new());
    let client = client(transport, SubscriptionParams::new());
    let ctx = StreamContext::new();
    let session = Arc::new(client.open(&ctx).await.unwrap());

    let reader = {
        let session = Arc::clone(&session);
        let ctx = ctx.clone();
        tokio::spawn(async move { session.recv(&ctx).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.close().await.unwrap();

    let result = reader.await.unwrap();
    assert_eq!(result.unwrap_err(), EventError::Closed);
    assert_eq!(session.state(), ConnectionState::Closed);
}

// ---- Stream Service ----

fn scripted_dialer(results: Vec<EventResult<Event>>, closed: Arc<AtomicBool>) -> MockDialer {
    let mut dialer = MockDialer::new();
    dialer.expect_dial().times(1).returning(move |_| {
        Ok(Box::new(ScriptedConnection {
            results: Mutex::new(results.clone().into()),
            closed: Arc::clone(&closed),
        }))
    });
    dialer
}

#[tokio::test]
async fn test_stream_forwards_events_then_error() {
    let closed = Arc::new(AtomicBool::new(false));
    let results = vec![
        decode_event(b"p_cmd\x02KP\x01p_no\x021"),
        decode_event(b"p_cmd\x02FD\x01p_no\x022\x01p_1_DPP\x02100"),
        Err(EventError::MissingDelimiter),
    ];
    let service = EventService::new(Arc::new(scripted_dialer(results, Arc::clone(&closed))));

    let (mut events, mut errors) = service.stream(&StreamContext::new());
    assert_eq!(events.recv().await.unwrap().kind(), "KP");
    assert_eq!(events.recv().await.unwrap().kind(), "FD");
    assert!(events.recv().await.is_none());
    assert_eq!(errors.recv().await, Some(EventError::MissingDelimiter));
    assert!(errors.recv().await.is_none());
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stream_cancellation_reports_cancelled() {
    let closed = Arc::new(AtomicBool::new(false));
    let service = EventService::new(Arc::new(scripted_dialer(Vec::new(), Arc::clone(&closed))));
    let ctx = StreamContext::new();

    let (mut events, mut errors) = service.stream(&ctx);
    tokio::time::sleep(Duration::from_millis(20)).await;
    ctx.cancel();

    assert!(events.recv().await.is_none());
    assert_eq!(errors.recv().await, Some(EventError::Cancelled));
    assert!(closed.load(Ordering::SeqCst));
}

/// Connection with an unbounded backlog of keep-alives.
struct EndlessConnection {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl EventConnection for EndlessConnection {
    async fn recv(&self, _ctx: &StreamContext) -> EventResult<Event> {
        decode_event(b"p_cmd\x02KP")
    }

    async fn close(&self) -> EventResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn endless_dialer(closed: Arc<AtomicBool>) -> MockDialer {
    let mut dialer = MockDialer::new();
    dialer.expect_dial().times(1).returning(move |_| {
        Ok(Box::new(EndlessConnection {
            closed: Arc::clone(&closed),
        }))
    });
    dialer
}

#[tokio::test]
async fn test_stalled_consumer_ends_on_deadline() {
    let closed = Arc::new(AtomicBool::new(false));
    let service = EventService::new(Arc::new(endless_dialer(Arc::clone(&closed))));
    let ctx = StreamContext::new().with_timeout(Duration::from_millis(100));

    let (_events, mut errors) = service.stream(&ctx);
    let err = tokio::time::timeout(Duration::from_secs(3), errors.recv())
        .await
        .expect("stream task must not stay blocked on a full channel");
    assert_eq!(err, Some(EventError::DeadlineExceeded));
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stalled_consumer_ends_on_cancel() {
    let closed = Arc::new(AtomicBool::new(false));
    let service = EventService::new(Arc::new(endless_dialer(Arc::clone(&closed))));
    let ctx = StreamContext::new();

    let (_events, mut errors) = service.stream(&ctx);
    tokio::time::sleep(Duration::from_millis(50)).await;
    ctx.cancel();

    let err = tokio::time::timeout(Duration::from_secs(3), errors.recv())
        .await
        .expect("stream task must not stay blocked on a full channel");
    assert_eq!(err, Some(EventError::Cancelled));
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_event_channel_closes_after_connection_close() {
    let closed = Arc::new(AtomicBool::new(false));
    let service = EventService::new(Arc::new(endless_dialer(Arc::clone(&closed))));
    let ctx = StreamContext::new();

    let (mut events, _errors) = service.stream(&ctx);
    assert_eq!(events.recv().await.unwrap().kind(), "KP");
    ctx.cancel();

    tokio::time::timeout(Duration::from_secs(3), async {
        while events.recv().await.is_some() {}
    })
    .await
    .expect("event channel closes once the stream task ends");
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_stream_dial_failure_is_forwarded() {
    let mut dialer = MockDialer::new();
    dialer
        .expect_dial()
        .returning(|_| Err(EventError::SessionActive));
    let service = EventService::new(Arc::new(dialer));

    let (mut events, mut errors) = service.stream(&StreamContext::new());
    assert!(events.recv().await.is_none());
    assert_eq!(errors.recv().await, Some(EventError::SessionActive));
}

#[tokio::test]
async fn test_stream_over_event_client() {
    let transport = FakeTransport::with(vec![Ok(vec![
        text("p_cmd\x02ST\x01p_errno\x020\x01p_err\x02"),
        text("p_cmd\x02KP"),
    ])]);
    let client = client(Arc::clone(&transport), SubscriptionParams::new());
    let service = EventService::new(Arc::new(client.clone()));
    let ctx = StreamContext::new();

    let (mut events, mut errors) = service.stream(&ctx);
    assert_eq!(events.recv().await.unwrap().kind(), "ST");
    assert_eq!(events.recv().await.unwrap().kind(), "KP");

    ctx.cancel();
    assert_eq!(errors.recv().await, Some(EventError::Cancelled));
    assert!(events.recv().await.is_none());
    assert!(!client.is_active());
}
