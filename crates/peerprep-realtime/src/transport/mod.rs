//! Realtime transports.
//!
//! A [`Transport`] knows how to open one kind of session against the
//! realtime endpoint; the provider walks the configured transports in
//! preference order on every attempt.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod polling;
pub mod websocket;

use std::sync::Arc;

use async_trait::async_trait;

use peerprep_core::config::TransportKind;
use peerprep_core::error::AppError;

use crate::endpoint::Endpoint;
use crate::message::packet::{EnginePacket, OpenHandshake};

pub use polling::PollingTransport;
pub use websocket::WebSocketTransport;

/// Credentials attached to every transport request.
///
/// The server authenticates the realtime connection from the session
/// cookie it issued at login; no token is passed in application code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// `name=value` cookie, if one is stored.
    pub cookie: Option<String>,
}

impl Credentials {
    /// Credentials carrying a session cookie.
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
        }
    }
}

/// Everything a transport needs to open a session.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Realtime endpoint.
    pub endpoint: Endpoint,
    /// Credentials to present.
    pub credentials: Credentials,
}

/// Factory for sessions of one transport kind.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Kind of session this transport opens.
    fn kind(&self) -> TransportKind;

    /// Opens a session and completes the engine handshake.
    async fn open(&self, request: &ConnectRequest) -> Result<Box<dyn TransportSession>, AppError>;
}

/// An open engine session.
#[async_trait]
pub trait TransportSession: Send {
    /// Handshake received when the session opened.
    fn handshake(&self) -> &OpenHandshake;

    /// Sends one packet.
    async fn send(&mut self, packet: EnginePacket) -> Result<(), AppError>;

    /// Receives the next packet. `Ok(None)` means the peer closed the session.
    async fn recv(&mut self) -> Result<Option<EnginePacket>, AppError>;

    /// Closes the session. Called exactly once per opened session.
    async fn close(&mut self) -> Result<(), AppError>;
}

/// Builds the network transports for the configured preference list.
pub fn from_kinds(kinds: &[TransportKind]) -> Vec<Arc<dyn Transport>> {
    kinds
        .iter()
        .map(|kind| -> Arc<dyn Transport> {
            match kind {
                TransportKind::Websocket => Arc::new(WebSocketTransport::new()),
                TransportKind::Polling => Arc::new(PollingTransport::new()),
            }
        })
        .collect()
}
