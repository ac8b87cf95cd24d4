//! The capability boundary between [`ClientSocket`](crate::ClientSocket) and
//! whatever actually moves bytes.
//!
//! [`Transport`] covers what an open connection can do, [`Connector`] covers
//! how one is obtained. Only real sockets implement both; test doubles
//! implement just the first and are handed to
//! [`ClientSocket::from_transport`](crate::ClientSocket::from_transport).

pub mod memory;
mod tcp;

use crate::config::SocketConfig;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::os::fd::{OwnedFd, RawFd};
use tokio::io::{AsyncRead, AsyncWrite};

pub use memory::MemoryTransport;

/// An open, exclusively owned byte-stream connection.
///
/// Dropping the value closes the connection.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// OS descriptor backing this connection, `-1` if there is none.
    fn raw_descriptor(&self) -> RawFd;

    /// Gives up the connection without closing it.
    fn into_descriptor(self) -> io::Result<OwnedFd>
    where
        Self: Sized;
}

pub trait Connector: Transport + Sized {
    /// Opens a connection to an already resolved address.
    fn connect(addr: SocketAddr, config: &SocketConfig) -> impl Future<Output = io::Result<Self>> + Send;

    /// Takes ownership of a connected descriptor. The descriptor is closed if
    /// it cannot be used.
    fn attach(fd: OwnedFd, config: &SocketConfig) -> io::Result<Self>;
}
