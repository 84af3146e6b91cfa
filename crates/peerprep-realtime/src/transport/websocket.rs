//! WebSocket transport over `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, COOKIE};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use peerprep_core::config::TransportKind;
use peerprep_core::error::{AppError, ErrorKind};

use crate::message::packet::{EnginePacket, OpenHandshake};

use super::{ConnectRequest, Transport, TransportSession};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens websocket sessions.
#[derive(Debug, Default, Clone)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Creates the transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Websocket
    }

    async fn open(&self, request: &ConnectRequest) -> Result<Box<dyn TransportSession>, AppError> {
        let url = request.endpoint.transport_url(TransportKind::Websocket)?;

        let mut client_request = url.as_str().into_client_request().map_err(|e| {
            AppError::with_source(ErrorKind::Connection, format!("Bad websocket URL {url}"), e)
        })?;
        if let Some(cookie) = &request.credentials.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| AppError::with_source(ErrorKind::Validation, "Invalid session cookie", e))?;
            client_request.headers_mut().insert(COOKIE, value);
        }

        let (mut stream, _) = connect_async(client_request).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Connection,
                format!("WebSocket connect to {url} failed"),
                e,
            )
        })?;

        let handshake = match read_packet(&mut stream).await? {
            Some(EnginePacket::Open(handshake)) => handshake,
            Some(other) => {
                let _ = stream.close(None).await;
                return Err(AppError::protocol(format!(
                    "Expected open packet, got {other:?}"
                )));
            }
            None => {
                return Err(AppError::connection(
                    "WebSocket closed before the open packet",
                ));
            }
        };

        debug!(sid = %handshake.sid, "WebSocket session opened");
        Ok(Box::new(WebSocketSession { stream, handshake }))
    }
}

/// An open websocket session.
struct WebSocketSession {
    stream: Stream,
    handshake: OpenHandshake,
}

#[async_trait]
impl TransportSession for WebSocketSession {
    fn handshake(&self) -> &OpenHandshake {
        &self.handshake
    }

    async fn send(&mut self, packet: EnginePacket) -> Result<(), AppError> {
        self.stream
            .send(Message::text(packet.encode()))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Connection, "WebSocket send failed", e))
    }

    async fn recv(&mut self) -> Result<Option<EnginePacket>, AppError> {
        read_packet(&mut self.stream).await
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Connection, "WebSocket close failed", e))
    }
}

/// Reads frames until a text packet or the end of the stream.
async fn read_packet(stream: &mut Stream) -> Result<Option<EnginePacket>, AppError> {
    while let Some(frame) = stream.next().await {
        let frame = frame
            .map_err(|e| AppError::with_source(ErrorKind::Connection, "WebSocket receive failed", e))?;
        match frame {
            Message::Text(text) => return EnginePacket::decode(text.as_str()).map(Some),
            Message::Close(_) => return Ok(None),
            Message::Binary(_) => {
                return Err(AppError::protocol("Binary websocket frames are not supported"));
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }
    Ok(None)
}
