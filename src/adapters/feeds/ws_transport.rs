//! WebSocket Transport - tokio-tungstenite Event Socket
//!
//! Implements `EventTransport` / `EventSocket` over `connect_async`
//! with rustls (webpki roots). Handshakes are bounded by the caller's
//! timeout; a server close frame or stream end is a read failure so
//! the connection manager reconnects.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, instrument};

use crate::error::{EventError, EventResult};
use crate::ports::transport::{EventSocket, EventTransport, SocketMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// `EventTransport` backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WsTransport {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventTransport for WsTransport {
    #[instrument(skip(self))]
    async fn open(&self, url: &str, timeout: Duration) -> EventResult<Box<dyn EventSocket>> {
        let (stream, response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| EventError::Connect(format!("handshake timed out after {timeout:?}")))?
            .map_err(|e| EventError::Connect(e.to_string()))?;

        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsSocket { stream }))
    }
}

/// One tungstenite stream.
pub struct WsSocket {
    stream: WsStream,
}

#[async_trait]
impl EventSocket for WsSocket {
    async fn read(&mut self) -> EventResult<SocketMessage> {
        match self.stream.next().await {
            Some(Ok(Message::Text(text))) => Ok(SocketMessage::Text(text)),
            Some(Ok(Message::Binary(data))) => Ok(SocketMessage::Binary(data)),
            Some(Ok(Message::Close(frame))) => {
                let reason = frame.map_or_else(String::new, |f| format!("{} {}", f.code, f.reason));
                Err(EventError::Read(format!("closed by server {reason}").trim_end().to_string()))
            }
            Some(Ok(_)) => Ok(SocketMessage::Control),
            Some(Err(e)) => Err(EventError::Read(e.to_string())),
            None => Err(EventError::Read("stream ended".to_string())),
        }
    }

    async fn close_normal(&mut self) -> EventResult<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| EventError::Connect(e.to_string()))
    }
}
