//! # peerprep-realtime
//!
//! Realtime connection for the PeerPrep client. Provides:
//!
//! - A connection provider that owns exactly one connection per mount
//! - A shared handle exposing status, identity, events and emits
//! - Bounded fixed-delay reconnect across websocket and polling transports
//! - An Engine.IO v4 / Socket.IO v5 text codec

pub mod connection;
pub mod endpoint;
pub mod message;
pub mod metrics;
pub mod transport;

pub use connection::{ConnectionHandle, ConnectionProvider, ConnectionState, ConnectionStatus};
pub use endpoint::Endpoint;
pub use message::{OutboundEmit, RealtimeEvent};
pub use transport::{Credentials, Transport, TransportSession};
