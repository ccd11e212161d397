//! WebSocket provider for a live game server

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::provider::Provider;
use crate::{BenchError, Result};

/// Client description sent to the server once the socket opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub device_type: String,
    pub aspect_ratio: f64,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self { device_type: "desktop".to_string(), aspect_ratio: 16.0 / 9.0 }
    }
}

/// The `ready` message that opens every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "ready", rename_all = "camelCase")]
pub struct ReadyMessage {
    pub client_info: ClientInfo,
}

/// Provider reading binary messages from a game server over WebSocket
pub struct WebSocketProvider {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
    closed: bool,
}

impl WebSocketProvider {
    /// Connect to `target` (`host:port` or a full `ws://` URL) and send the
    /// ready message.
    pub async fn connect(target: &str, client_info: ClientInfo) -> Result<Self> {
        let url = if target.contains("://") {
            target.to_string()
        } else {
            format!("ws://{target}")
        };
        info!(url = %url, "Connecting to game server");

        let (mut stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| BenchError::connection_failed_with_source(url.clone(), Box::new(e)))?;
        debug!(status = %response.status(), "WebSocket upgrade complete");

        let ready = serde_json::to_string(&ReadyMessage { client_info })
            .map_err(|e| BenchError::protocol("ready message", e.to_string()))?;
        stream
            .send(Message::text(ready))
            .await
            .map_err(|e| BenchError::transport("failed to send ready message", Box::new(e)))?;

        Ok(Self { stream, url, closed: false })
    }
}

#[async_trait::async_trait]
impl Provider for WebSocketProvider {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        if self.closed {
            return Ok(None);
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    trace!(bytes = data.len(), "Binary message");
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        warn!(error = %e, "Failed to answer ping");
                    }
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Text(text))) => {
                    debug!(text = %text.as_str(), "Skipping text message");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(reason = ?frame, "Server closed the connection");
                    self.closed = true;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Err(BenchError::transport("websocket read failed", Box::new(e)));
                }
                None => {
                    self.closed = true;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(url = %self.url, "Closing WebSocket");
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(BenchError::transport("websocket close failed", Box::new(e))),
        }
    }

    fn target(&self) -> &str {
        &self.url
    }
}
