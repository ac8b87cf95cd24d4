//! src/client/socket.rs

use crate::client::error::{Result, SocketError};
use crate::config::{SocketConfig, DEFAULT_BUFFER_SIZE};
use crate::transport::{Connector, Transport};
use crate::{rapid_debug, rapid_info, rapid_trace, rapid_warn};
use bytes::{Bytes, BytesMut};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

type Buffered<T> = BufReader<BufWriter<T>>;

pub type TcpClientSocket = ClientSocket<TcpStream>;

/// One client connection with explicit open/closed state.
///
/// The socket exclusively owns its transport. Closing, detaching or dropping
/// it releases the transport exactly once; every I/O call on a closed socket
/// fails with [`SocketError::Closed`] without touching the transport.
///
/// By default every `send` goes straight to the transport. With a non-zero
/// [`SocketConfig::write_buffer_size`] output is held back until the buffer
/// fills or [`flush`](Self::flush) is called, and a fault while flushing
/// carries no byte count.
pub struct ClientSocket<T: Transport = TcpStream> {
    id: Uuid,
    handle: Option<Buffered<T>>,
    peer: Option<SocketAddr>,
    config: SocketConfig,
}

impl<T: Transport> ClientSocket<T> {
    /// A socket that holds no connection yet. Open it with `reconnect` or `attach`.
    pub fn closed(config: SocketConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: None,
            peer: None,
            config,
        }
    }

    /// Wraps a connection that is already open, e.g. one produced by a listener.
    pub fn from_transport(transport: T, config: SocketConfig) -> Self {
        let mut socket = Self::closed(config);
        socket.install(transport);
        rapid_debug!("Socket {} wraps an open transport", socket.id);
        socket
    }

    #[inline] pub fn id(&self) -> Uuid                        { self.id }
    #[inline] pub fn is_closed(&self) -> bool                 { self.handle.is_none() }
    #[inline] pub fn peer_address(&self) -> Option<SocketAddr> { self.peer }
    #[inline] pub fn config(&self) -> &SocketConfig           { &self.config }

    /// Descriptor of the held connection, `None` while closed.
    pub fn file_descriptor(&self) -> Option<RawFd> {
        self.handle.as_ref().map(|h| h.get_ref().get_ref().raw_descriptor())
    }

    /* ----------------------------------------------------------------
       Output
    ---------------------------------------------------------------- */

    /// Hands all of `data` to the connection.
    ///
    /// On failure the error carries how many bytes were accepted before the
    /// fault; resending the remainder is up to the caller.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let (id, deadline) = (self.id, self.deadline());
        let stream = self.stream()?;

        let mut written = 0;
        while written < data.len() {
            match within(deadline, stream.write(&data[written..])).await {
                Ok(0) => {
                    let err = io::Error::from(io::ErrorKind::WriteZero);
                    return Err(transfer_fault(id, "send", &err, Some(written)));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(transfer_fault(id, "send", &e, Some(written))),
            }
        }

        rapid_trace!("Socket {} queued {} bytes", id, written);
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        let (id, deadline) = (self.id, self.deadline());
        let stream = self.stream()?;

        within(deadline, stream.flush())
            .await
            .map_err(|e| transfer_fault(id, "flush", &e, None))
    }

    /* ----------------------------------------------------------------
       Input
    ---------------------------------------------------------------- */

    /// Reads until `buffer_size` bytes have arrived or the peer ends the
    /// stream. Once the peer is gone every call returns an empty buffer.
    pub async fn receive(&mut self, buffer_size: usize) -> Result<Bytes> {
        let (id, deadline) = (self.id, self.deadline());
        let stream = self.stream()?;

        let mut buf = BytesMut::zeroed(buffer_size);
        let mut filled = 0;
        while filled < buffer_size {
            match within(deadline, stream.read(&mut buf[filled..])).await {
                Ok(0) => {
                    rapid_debug!("Socket {} reached end of stream after {} bytes", id, filled);
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(transfer_fault(id, "receive", &e, Some(filled))),
            }
        }

        buf.truncate(filled);
        Ok(buf.freeze())
    }

    /// Reads up to and including the first `delimiter`, never more than
    /// `buffer_size` bytes.
    ///
    /// Running out of room before the delimiter shows up is not an error: the
    /// bytes collected so far are returned and the rest of the message stays
    /// in the stream. The same applies to end of stream. Nothing past the
    /// delimiter is consumed.
    pub async fn receive_until(&mut self, buffer_size: usize, delimiter: &[u8]) -> Result<Bytes> {
        let (id, deadline) = (self.id, self.deadline());
        let stream = self.stream()?;

        if delimiter.is_empty() {
            let err = io::Error::new(io::ErrorKind::InvalidInput, "empty delimiter");
            return Err(transfer_fault(id, "receive_until", &err, Some(0)));
        }

        let mut out = BytesMut::with_capacity(buffer_size.min(DEFAULT_BUFFER_SIZE));
        loop {
            if out.len() == buffer_size {
                rapid_debug!("Socket {} filled {} bytes before delimiter", id, buffer_size);
                return Ok(out.freeze());
            }

            let available = match within(deadline, stream.fill_buf()).await {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(transfer_fault(id, "receive_until", &e, Some(out.len()))),
            };
            if available.is_empty() {
                rapid_debug!("Socket {} reached end of stream before delimiter", id);
                return Ok(out.freeze());
            }

            let room = buffer_size - out.len();
            let mut taken = 0;
            let mut found = false;
            for &byte in available.iter().take(room) {
                out.extend_from_slice(&[byte]);
                taken += 1;
                if out.ends_with(delimiter) {
                    found = true;
                    break;
                }
            }
            stream.consume(taken);

            if found {
                return Ok(out.freeze());
            }
        }
    }

    /* ----------------------------------------------------------------
       Ownership
    ---------------------------------------------------------------- */

    /// Gives the live descriptor back to the caller and leaves the socket
    /// closed. The connection itself stays up.
    ///
    /// Buffered input and unflushed output are dropped.
    pub fn detach(&mut self) -> Result<OwnedFd> {
        let handle = self.handle.take().ok_or(SocketError::Closed)?;
        report_discarded(self.id, &handle);

        let fd = handle
            .into_inner()
            .into_inner()
            .into_descriptor()
            .map_err(|e| transfer_fault(self.id, "detach", &e, None))?;

        rapid_info!("Socket {} detached descriptor {}", self.id, fd.as_raw_fd());
        Ok(fd)
    }

    /// Releases the connection. Does nothing on a closed socket.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            report_discarded(self.id, &handle);
            drop(handle);
            rapid_debug!("Socket {} closed", self.id);
        }
    }

    /* ----------------------------------------------------------------
       Private helpers
    ---------------------------------------------------------------- */

    fn install(&mut self, transport: T) {
        let writer = BufWriter::with_capacity(self.config.write_buffer_size(), transport);
        self.handle = Some(BufReader::with_capacity(self.config.read_buffer_size(), writer));
    }

    fn stream(&mut self) -> Result<&mut Buffered<T>> {
        self.handle.as_mut().ok_or(SocketError::Closed)
    }

    fn deadline(&self) -> Option<Instant> {
        // A timeout too large to represent means no deadline.
        self.config.io_timeout().and_then(|limit| Instant::now().checked_add(limit))
    }
}

impl<T: Connector> ClientSocket<T> {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with(addr, SocketConfig::default()).await
    }

    pub async fn connect_with(addr: SocketAddr, config: SocketConfig) -> Result<Self> {
        let mut socket = Self::closed(config);
        socket.reconnect(addr).await?;
        Ok(socket)
    }

    /// Drops the current connection, if any, and connects to `addr`.
    /// The socket stays closed when the connect fails.
    pub async fn reconnect(&mut self, addr: SocketAddr) -> Result<()> {
        self.close();
        self.peer = None;

        match T::connect(addr, &self.config).await {
            Ok(transport) => {
                self.install(transport);
                self.peer = Some(addr);
                rapid_info!("Socket {} connected to {}", self.id, addr);
                Ok(())
            }
            Err(e) => {
                rapid_warn!("Socket {} failed to connect to {}: {}", self.id, addr, e);
                Err(SocketError::connection(&e))
            }
        }
    }

    pub fn attach_descriptor(fd: OwnedFd) -> Result<Self> {
        Self::attach_descriptor_with(fd, SocketConfig::default())
    }

    pub fn attach_descriptor_with(fd: OwnedFd, config: SocketConfig) -> Result<Self> {
        let mut socket = Self::closed(config);
        socket.attach(fd)?;
        Ok(socket)
    }

    /// Closes the current connection, if any, and takes over `fd`.
    /// The socket stays closed when `fd` is unusable.
    pub fn attach(&mut self, fd: OwnedFd) -> Result<()> {
        self.close();
        self.peer = None;

        let raw = fd.as_raw_fd();
        match T::attach(fd, &self.config) {
            Ok(transport) => {
                self.install(transport);
                rapid_info!("Socket {} attached to descriptor {}", self.id, raw);
                Ok(())
            }
            Err(e) => {
                rapid_warn!("Socket {} failed to attach descriptor {}: {}", self.id, raw, e);
                Err(SocketError::connection(&e))
            }
        }
    }
}

impl<T: Transport> Drop for ClientSocket<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> std::fmt::Debug for ClientSocket<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSocket")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("peer", &self.peer)
            .field("fd", &self.file_descriptor())
            .finish()
    }
}

async fn within<F, R>(deadline: Option<Instant>, op: F) -> io::Result<R>
where
    F: Future<Output = io::Result<R>>,
{
    match deadline {
        Some(at) => timeout_at(at, op)
            .await
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::TimedOut, "operation timed out"))),
        None => op.await,
    }
}

fn transfer_fault(id: Uuid, op: &str, err: &io::Error, bytes_processed: Option<usize>) -> SocketError {
    rapid_warn!("Socket {} {} failed after {:?} bytes: {}", id, op, bytes_processed, err);
    SocketError::transfer(err, bytes_processed)
}

fn report_discarded<T: Transport>(id: Uuid, handle: &Buffered<T>) {
    let unread = handle.buffer().len();
    let unsent = handle.get_ref().buffer().len();
    if unread > 0 || unsent > 0 {
        rapid_warn!(
            "Socket {} released with {} unread and {} unflushed bytes",
            id, unread, unsent
        );
    }
}
