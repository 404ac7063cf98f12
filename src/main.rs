//! kabu Event Feed - Entry Point
//!
//! Streams gateway events and prints them, either one line per event or
//! as a periodically redrawn quote board. Runs until SIGINT or until
//! the stream fails.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from argv) + env overrides + validate
//! 2. Init tracing (text or JSON structured logging)
//! 3. Create FeedMetrics and spawn the health/metrics server
//! 4. Create EventClient (static endpoint + WebSocket transport)
//! 5. Spawn EventService stream task
//! 6. Print events or render the board until SIGINT / stream error
//! 7. Graceful shutdown (cancel stream → wait for close → readiness 503 → exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use kabu_event_feed::adapters::feeds::{StaticEndpoint, WsTransport};
use kabu_event_feed::adapters::metrics::{FeedMetrics, HealthServer};
use kabu_event_feed::config::{AppConfig, OutputFormat, OutputMode, loader};
use kabu_event_feed::domain::event::Event;
use kabu_event_feed::domain::quote_book::QuoteBook;
use kabu_event_feed::error::EventError;
use kabu_event_feed::ports::FeedObserver;
use kabu_event_feed::usecases::{
    ClientSettings, EventClient, EventService, StreamContext, build_symbol_map, render_board,
};

const DEFAULT_CONFIG: &str = "config.toml";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = loader::load_config(&path).context("Failed to load configuration")?;

    // ── 2. Initialize structured logging ────────────────────
    init_tracing(&config);

    info!(
        name = %config.client.name,
        version = env!("CARGO_PKG_VERSION"),
        mode = ?config.output.mode,
        rid = config.subscription.rid,
        "Starting kabu event feed"
    );

    // ── 3. Metrics + health server ──────────────────────────
    let metrics = Arc::new(FeedMetrics::new().context("Failed to register metrics")?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let health_handle = if config.metrics.enabled {
        let server = HealthServer::new(Arc::clone(&metrics), config.metrics.bind_address.clone());
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(shutdown_rx).await {
                error!(error = %e, "Health server failed");
            }
        }))
    } else {
        None
    };

    // ── 4. Event client ─────────────────────────────────────
    let params = config.subscription.to_params();
    let client = EventClient::new(
        Arc::new(StaticEndpoint::new(config.api.event_url.clone())),
        Arc::new(WsTransport::new()),
        params,
    )
    .with_settings(ClientSettings::from_config(&config))
    .with_observer(Arc::clone(&metrics) as Arc<dyn FeedObserver>);

    // ── 5. Stream task ──────────────────────────────────────
    let ctx = StreamContext::new();
    let service = EventService::new(Arc::new(client));
    let (mut events, mut errors) = service.stream(&ctx);

    // ── 6. Output loop ──────────────────────────────────────
    let result = match config.output.mode {
        OutputMode::Events => print_events(&config, &mut events, &mut errors).await,
        OutputMode::Board => print_board(&config, &mut events, &mut errors).await,
    };

    // ── 7. Graceful shutdown ────────────────────────────────
    ctx.cancel();
    // The stream task drops its sender only after closing the connection.
    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        while events.recv().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("Event stream did not close within the shutdown timeout");
    }
    let _ = shutdown_tx.send(true);
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await;
    }

    match &result {
        Ok(()) => info!("Shutdown complete"),
        Err(e) => error!(error = %e, "Event stream failed"),
    }
    result
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.client.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.client.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// One line per event until SIGINT or the stream ends.
async fn print_events(
    config: &AppConfig,
    events: &mut mpsc::Receiver<Event>,
    errors: &mut mpsc::Receiver<EventError>,
) -> Result<()> {
    let format = config.output.format;
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("SIGINT received, initiating graceful shutdown");
                return Ok(());
            }
            event = events.recv() => match event {
                Some(event) => println!("{}", format_event(&event, format)?),
                None => return stream_end(errors).await,
            },
        }
    }
}

/// Redraw the board every `refresh_ms` when FD updates arrived.
async fn print_board(
    config: &AppConfig,
    events: &mut mpsc::Receiver<Event>,
    errors: &mut mpsc::Receiver<EventError>,
) -> Result<()> {
    let params = config.subscription.to_params();
    let symbols = build_symbol_map(&params.rows, &params.issue_codes);
    let levels = config.output.board_levels;

    let mut book = QuoteBook::new();
    let mut dirty = false;
    let mut ticker = tokio::time::interval(Duration::from_millis(config.output.refresh_ms));

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("SIGINT received, initiating graceful shutdown");
                return Ok(());
            }
            event = events.recv() => match event {
                Some(Event::Fd(fd)) => {
                    book.apply(&fd);
                    dirty = true;
                }
                Some(_) => {}
                None => return stream_end(errors).await,
            },
            _ = ticker.tick() => {
                if dirty {
                    for line in render_board(&book.snapshot_rows(), &symbols, levels) {
                        println!("{line}");
                    }
                    dirty = false;
                }
            }
        }
    }
}

/// The event channel closed: surface the task's error, if any.
async fn stream_end(errors: &mut mpsc::Receiver<EventError>) -> Result<()> {
    match errors.recv().await {
        None | Some(EventError::Cancelled) => Ok(()),
        Some(e) => Err(e).context("Event stream terminated"),
    }
}

fn format_event(event: &Event, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string(event).context("Failed to encode event");
    }

    let header = event.frame().map_or_else(String::new, |frame| {
        format!(" no={} date={}", frame.no, frame.date)
    });
    let detail = match event {
        Event::St(st) => format!("errno={} err={}", st.err_no, st.err),
        Event::Kp(_) => String::new(),
        Event::Fd(fd) => format!("rows={}", fd.rows.len()),
        Event::Ec(ec) => {
            let order = ec.order();
            let mut line = format!(
                "order={} symbol={} side={} status={}",
                order.id, order.symbol, order.side, order.status
            );
            if let Some(exec) = ec.execution() {
                let price = exec.price.map(|p| p.to_string()).unwrap_or_default();
                let qty = exec.quantity.map(|q| q.to_string()).unwrap_or_default();
                line.push_str(&format!(" exec={price}x{qty}@{}", exec.time));
            }
            line
        }
        Event::Ns(ns) => format!("id={} headline={}", ns.news_id, ns.headline),
        Event::Ss(ss) => format!("status={} login={}", ss.system_status, ss.login_kind),
        Event::Us(us) => format!(
            "market={} underlying={} status={}",
            us.market_code, us.underlying_code, us.operation_status
        ),
        Event::Raw(frame) => format!("fields={}", frame.fields.len()),
        Event::Unknown { raw } => {
            warn!(bytes = raw.len(), "Unsupported event command");
            format!("bytes={}", raw.len())
        }
    };
    Ok(format!("{}{header} {detail}", event.kind()).trim_end().to_string())
}
