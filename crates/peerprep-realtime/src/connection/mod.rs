//! Connection lifecycle: the provider, its shared handle, and the driver
//! task that owns the transport.

mod driver;
pub mod handle;
pub mod heartbeat;
pub mod provider;
pub mod reconnect;

pub use handle::{ConnectionHandle, ConnectionState, ConnectionStatus};
pub use provider::ConnectionProvider;
pub use reconnect::ReconnectPolicy;
