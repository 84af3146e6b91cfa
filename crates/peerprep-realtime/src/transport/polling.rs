//! HTTP long-polling transport over `reqwest`.
//!
//! A background task keeps one GET outstanding and forwards decoded
//! packets to the session, so [`TransportSession::recv`] stays cancel-safe
//! while the driver interleaves sends.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, Url};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use peerprep_core::config::TransportKind;
use peerprep_core::error::{AppError, ErrorKind};

use crate::message::packet::{EnginePacket, OpenHandshake};

use super::{ConnectRequest, Transport, TransportSession};

/// Packets buffered between the poll task and the session.
const POLL_BUFFER: usize = 64;

/// Opens long-polling sessions.
#[derive(Debug, Clone, Default)]
pub struct PollingTransport {
    client: Client,
}

impl PollingTransport {
    /// Creates the transport with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Transport for PollingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }

    async fn open(&self, request: &ConnectRequest) -> Result<Box<dyn TransportSession>, AppError> {
        let url = request.endpoint.transport_url(TransportKind::Polling)?;
        let cookie = request.credentials.cookie.clone();

        let mut packets = poll(&self.client, &url, cookie.as_deref()).await?.into_iter();
        let handshake = match packets.next() {
            Some(EnginePacket::Open(handshake)) => handshake,
            other => {
                return Err(AppError::protocol(format!(
                    "Expected open packet, got {other:?}"
                )));
            }
        };

        let mut session_url = url;
        session_url.query_pairs_mut().append_pair("sid", &handshake.sid);

        let (tx, rx) = mpsc::channel(POLL_BUFFER);
        for packet in packets {
            // Fresh channel with capacity to spare
            let _ = tx.try_send(Ok(packet));
        }

        let poller = tokio::spawn(run_poller(
            self.client.clone(),
            session_url.clone(),
            cookie.clone(),
            tx,
        ));

        debug!(sid = %handshake.sid, "Polling session opened");
        Ok(Box::new(PollingSession {
            client: self.client.clone(),
            url: session_url,
            cookie,
            handshake,
            inbound: rx,
            poller,
        }))
    }
}

/// An open polling session.
struct PollingSession {
    client: Client,
    url: Url,
    cookie: Option<String>,
    handshake: OpenHandshake,
    inbound: mpsc::Receiver<Result<EnginePacket, AppError>>,
    poller: JoinHandle<()>,
}

#[async_trait]
impl TransportSession for PollingSession {
    fn handshake(&self) -> &OpenHandshake {
        &self.handshake
    }

    async fn send(&mut self, packet: EnginePacket) -> Result<(), AppError> {
        post(&self.client, &self.url, self.cookie.as_deref(), packet.encode()).await
    }

    async fn recv(&mut self) -> Result<Option<EnginePacket>, AppError> {
        match self.inbound.recv().await {
            Some(Ok(packet)) => Ok(Some(packet)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.poller.abort();
        post(
            &self.client,
            &self.url,
            self.cookie.as_deref(),
            EnginePacket::Close.encode(),
        )
        .await
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

/// Keeps one GET outstanding until the server closes or the session drops.
async fn run_poller(
    client: Client,
    url: Url,
    cookie: Option<String>,
    tx: mpsc::Sender<Result<EnginePacket, AppError>>,
) {
    loop {
        let packets = match poll(&client, &url, cookie.as_deref()).await {
            Ok(packets) => packets,
            Err(e) => {
                warn!(error = %e, "Poll request failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        for packet in packets {
            let closing = packet == EnginePacket::Close;
            if tx.send(Ok(packet)).await.is_err() || closing {
                return;
            }
        }
    }
}

async fn poll(client: &Client, url: &Url, cookie: Option<&str>) -> Result<Vec<EnginePacket>, AppError> {
    let mut request = client.get(url.clone());
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }

    let response = request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AppError::with_source(ErrorKind::Connection, format!("Poll of {url} failed"), e))?;
    let body = response
        .text()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Connection, "Poll body unreadable", e))?;

    EnginePacket::decode_payload(&body)
}

async fn post(client: &Client, url: &Url, cookie: Option<&str>, body: String) -> Result<(), AppError> {
    let mut request = client
        .post(url.clone())
        .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
        .body(body);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }

    request
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map(|_| ())
        .map_err(|e| AppError::with_source(ErrorKind::Connection, format!("Post to {url} failed"), e))
}
