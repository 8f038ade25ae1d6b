use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

/// Derive the voice-agent WebSocket URL from the configured API base
///
/// Scheme swap only (`http` -> `ws`, `https` -> `wss`), then the fixed
/// agent path plus the recipe id.
pub fn voice_agent_url(api_base: &str, recipe_id: &str) -> String {
    let base = api_base.trim_end_matches('/');
    let ws_base = if base.starts_with("https") {
        base.replacen("https", "wss", 1)
    } else {
        base.replacen("http", "ws", 1)
    };
    format!("{}/ws/v1/voice-agent/{}", ws_base, recipe_id)
}

/// Inbound transport event delivered to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame from the server (undecoded JSON)
    Message(String),
    /// Connection failure; fatal for the session, no reconnect
    Failed(String),
    /// Graceful close from the peer
    Closed,
}

/// Outbound write command consumed by a transport writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Raw binary payload (one PCM frame)
    Binary(Vec<u8>),
    /// Graceful shutdown with a normal closure code
    Close,
}

/// Handle to one live voice-agent connection
///
/// Owned exclusively by the session for the session lifetime. The event
/// receiver is taken once by the session's event loop.
pub struct TransportHandle {
    write_tx: mpsc::Sender<OutboundFrame>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    closed: AtomicBool,
}

impl TransportHandle {
    pub fn new(
        write_tx: mpsc::Sender<OutboundFrame>,
        events: mpsc::Receiver<TransportEvent>,
    ) -> Self {
        Self {
            write_tx,
            events: Some(events),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue one binary frame for sending
    ///
    /// Non-blocking: the audio path must never stall on a slow socket, so a
    /// saturated writer drops the frame with a warning.
    pub fn send_binary(&self, bytes: Vec<u8>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.write_tx.try_send(OutboundFrame::Binary(bytes)) {
            warn!("dropping audio frame: {e}");
        }
    }

    /// Request a graceful close; idempotent
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Writer may already be gone after a failure; nothing to do then
        let _ = self.write_tx.send(OutboundFrame::Close).await;
    }

    /// Take the inbound event receiver (once)
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TransportEvent>> {
        self.events.take()
    }
}

/// Connection factory seam
///
/// The session state machine only sees `TransportHandle`s, so tests can
/// drive it with an in-memory connector.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<TransportHandle>;
}

/// WebSocket connector for the real voice-agent endpoint
pub struct WsConnector;

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<TransportHandle> {
        info!("connecting to voice agent at {}", url);

        let (ws, _response) = connect_async(url)
            .await
            .context("Failed to connect to voice agent")?;

        info!("voice agent connected");

        let (mut sink, mut stream) = ws.split();
        let (write_tx, mut write_rx) = mpsc::channel::<OutboundFrame>(64);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(64);

        // Writer task: drains outbound frames in order
        tokio::spawn(async move {
            while let Some(cmd) = write_rx.recv().await {
                match cmd {
                    OutboundFrame::Binary(bytes) => {
                        if sink.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    OutboundFrame::Close => {
                        let frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "session ended".into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                }
            }
        });

        // Reader task: translates inbound frames to events, in receipt order
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if event_tx.send(TransportEvent::Message(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        let _ = event_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx.send(TransportEvent::Failed(e.to_string())).await;
                        break;
                    }
                }
            }
        });

        Ok(TransportHandle::new(write_tx, event_rx))
    }
}
