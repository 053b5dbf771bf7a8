use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::{error, warn};

use shared::protocol::{ClientRequest, ServerEvent};

use crate::ChatChannel;

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// WebSocket-backed event channel: protocol enums as JSON text frames.
/// One long-lived connection shared by every component of the session.
#[derive(Debug)]
pub struct WsChannel {
    writer: Mutex<WsWriter>,
    events: broadcast::Sender<ServerEvent>,
    reader_task: JoinHandle<()>,
}

impl WsChannel {
    pub async fn connect(server_url: &str) -> Result<Arc<Self>> {
        let ws_url = if server_url.starts_with("https://") {
            server_url.replacen("https://", "wss://", 1)
        } else if server_url.starts_with("http://") {
            server_url.replacen("http://", "ws://", 1)
        } else {
            return Err(anyhow!("server_url must start with http:// or https://"));
        };
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        let (writer, mut reader) = ws_stream.split();

        let (events, _) = broadcast::channel(1024);
        let sender = events.clone();
        let reader_task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            let _ = sender.send(event);
                        }
                        Err(err) => warn!(%err, "ignoring malformed channel event"),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        error!(%err, "channel receive failed");
                        break;
                    }
                }
            }
        });

        Ok(Arc::new(Self {
            writer: Mutex::new(writer),
            events,
            reader_task,
        }))
    }

    /// Tears the connection down. Pending subscriptions see the feed close.
    pub async fn close(&self) {
        self.reader_task.abort();
        let mut writer = self.writer.lock().await;
        let _ = writer.send(WsMessage::Close(None)).await;
    }
}

#[async_trait]
impl ChatChannel for WsChannel {
    async fn emit(&self, request: ClientRequest) -> Result<()> {
        let text = serde_json::to_string(&request).context("failed to serialize channel event")?;
        self.writer
            .lock()
            .await
            .send(WsMessage::Text(text))
            .await
            .context("channel emission failed")
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
