//! Realtime wire codec and the event types consumers see.

pub mod packet;
pub mod types;

pub use packet::{EnginePacket, OpenHandshake, SocketPacket};
pub use types::{OutboundEmit, RealtimeEvent};
