//! Push channel: state machine, trait seam, and WebSocket implementation
//!
//! Client-to-server protocol v1: one decimal site id per text frame, one
//! frame per online site, as a lightweight request-for-update. The legacy
//! `"1"` keepalive frame of older dashboard builds is not part of v1.
//! Server-to-client frames are JSON-encoded site snapshots, one per frame.

use std::fmt;

use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::site::Site;

/// Connection state of the push channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Disconnected => write!(f, "disconnected"),
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Connected => write!(f, "connected"),
        }
    }
}

/// Events surfaced by the channel to the engine.
///
/// A clean close and a network error both surface as `Closed`; the two are
/// deliberately not distinguished.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Opened,
    SiteUpdate(Site),
    Closed,
}

/// Abstraction over the push channel for dependency injection
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Start a connection attempt
    async fn connect(&self) -> crate::Result<()>;

    /// Tear the connection down, stopping the reader so no events outlive it
    async fn close(&self) -> crate::Result<()>;

    /// Request an update for one site
    async fn send_site_id(&self, id: i64) -> crate::Result<()>;

    /// Next channel event; pends while the channel is quiet
    async fn recv(&self) -> ChannelEvent;
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Production push channel over a WebSocket
pub struct WsPushChannel {
    url: String,
    writer: Mutex<Option<WsSink>>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
    event_tx: mpsc::Sender<ChannelEvent>,
    events: Mutex<mpsc::Receiver<ChannelEvent>>,
}

impl fmt::Debug for WsPushChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsPushChannel").field("url", &self.url).finish()
    }
}

impl WsPushChannel {
    pub fn new(url: impl Into<String>) -> Self {
        let (event_tx, events) = mpsc::channel(64);
        Self {
            url: url.into(),
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            event_tx,
            events: Mutex::new(events),
        }
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn connect(&self) -> crate::Result<()> {
        tracing::debug!("Connecting push channel to {}", self.url);
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| crate::HeimdallError::Channel(format!("connect {}: {}", self.url, e)))?;

        let (sink, mut source) = stream.split();
        *self.writer.lock().await = Some(sink);

        let event_tx = self.event_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match Site::from_push_frame(text.as_str()) {
                        Ok(site) => {
                            if event_tx.send(ChannelEvent::SiteUpdate(site)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!("Discarding push frame: {}", e),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            let _ = event_tx.send(ChannelEvent::Closed).await;
        });

        // A lingering reader from a previous connection must not feed
        // events into the new one
        if let Some(old) = self.reader.lock().await.replace(reader) {
            old.abort();
        }

        self.event_tx
            .send(ChannelEvent::Opened)
            .await
            .map_err(|_| crate::HeimdallError::Channel("event queue closed".to_string()))?;
        Ok(())
    }

    async fn close(&self) -> crate::Result<()> {
        tracing::debug!("Closing push channel");
        if let Some(mut sink) = self.writer.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        Ok(())
    }

    async fn send_site_id(&self, id: i64) -> crate::Result<()> {
        let mut writer = self.writer.lock().await;
        let sink = writer
            .as_mut()
            .ok_or_else(|| crate::HeimdallError::Channel("channel not open".to_string()))?;
        sink.send(Message::text(id.to_string()))
            .await
            .map_err(|e| crate::HeimdallError::Channel(format!("send {}: {}", id, e)))
    }

    async fn recv(&self) -> ChannelEvent {
        let mut events = self.events.lock().await;
        match events.recv().await {
            Some(event) => event,
            // The struct holds a sender, so this only happens on teardown
            None => ChannelEvent::Closed,
        }
    }
}
