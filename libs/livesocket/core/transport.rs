//! Default transport over tokio-tungstenite

use crate::traits::*;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects with `tokio_tungstenite::connect_async`
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
        let (ws_stream, response) = connect_async(url)
            .await
            .map_err(|e| LiveSocketError::WebSocket(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        let (write, read) = ws_stream.split();
        Ok((
            Box::new(TungsteniteSink { write }),
            Box::new(TungsteniteStream { read }),
        ))
    }
}

struct TungsteniteSink {
    write: SplitSink<WsStream, Message>,
}

#[async_trait]
impl TransportSink for TungsteniteSink {
    async fn send(&mut self, message: WsMessage) -> Result<()> {
        self.write
            .send(ws_message_to_tungstenite(message))
            .await
            .map_err(|e| LiveSocketError::WebSocket(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.write
            .close()
            .await
            .map_err(|e| LiveSocketError::WebSocket(e.to_string()))
    }
}

struct TungsteniteStream {
    read: SplitStream<WsStream>,
}

#[async_trait]
impl TransportStream for TungsteniteStream {
    async fn next_event(&mut self) -> TransportEvent {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Close frame received");
                    return TransportEvent::Closed;
                }
                Some(Ok(msg)) => {
                    if let Some(ws_msg) = tungstenite_to_ws_message(msg) {
                        return TransportEvent::Message(ws_msg);
                    }
                    // Control frames are answered by tungstenite itself
                }
                Some(Err(e)) => return TransportEvent::Error(e.to_string()),
                None => return TransportEvent::Error("stream ended without close frame".into()),
            }
        }
    }
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
