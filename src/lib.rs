//! Single-connection TCP client socket with explicit open/closed state,
//! buffered fixed-size and delimiter-framed receives, and errors that keep
//! track of partially transferred data.

pub mod client;
pub mod config;
pub mod rapid_log;
pub mod transport;

/* Re-exports */
pub use client::{ClientSocket, Result, SocketError, TcpClientSocket};
pub use config::SocketConfig;
pub use transport::{Connector, MemoryTransport, Transport};
