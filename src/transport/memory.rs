//! In-memory transport for exercising sockets without the network.

use super::Transport;
use std::io;
use std::os::fd::{OwnedFd, RawFd};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

/// One end of a [`tokio::io::duplex`] pipe, with optional fault injection.
///
/// The other end is a plain [`DuplexStream`] that plays the peer.
#[derive(Debug)]
pub struct MemoryTransport {
    inner: DuplexStream,
    accepted: usize,
    reset_after: Option<usize>,
    read_fault: Option<io::ErrorKind>,
}

impl MemoryTransport {
    /// `max_buf_size` bounds how many bytes may sit in each direction before
    /// the writer has to wait for the reader.
    pub fn pair(max_buf_size: usize) -> (Self, DuplexStream) {
        let (local, peer) = tokio::io::duplex(max_buf_size);
        let transport = Self {
            inner: local,
            accepted: 0,
            reset_after: None,
            read_fault: None,
        };
        (transport, peer)
    }

    /// Accept `bytes` bytes of output, then fail every write with
    /// `ConnectionReset`.
    pub fn reset_after(mut self, bytes: usize) -> Self {
        self.reset_after = Some(bytes);
        self
    }

    /// Report `kind` instead of end of stream once the peer hangs up.
    pub fn fail_reads_with(mut self, kind: io::ErrorKind) -> Self {
        self.read_fault = Some(kind);
        self
    }

    pub fn bytes_accepted(&self) -> usize {
        self.accepted
    }
}

impl AsyncRead for MemoryTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let at_eof = buf.filled().len() == before && buf.remaining() > 0;
        match this.read_fault {
            Some(kind) if at_eof => Poll::Ready(Err(io::Error::from(kind))),
            _ => Poll::Ready(Ok(())),
        }
    }
}

impl AsyncWrite for MemoryTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let allowed = match this.reset_after {
            Some(limit) if this.accepted >= limit => {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "Connection reset by peer",
                )));
            }
            Some(limit) => buf.len().min(limit - this.accepted),
            None => buf.len(),
        };

        let n = ready!(Pin::new(&mut this.inner).poll_write(cx, &buf[..allowed]))?;
        this.accepted += n;
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

impl Transport for MemoryTransport {
    fn raw_descriptor(&self) -> RawFd {
        -1
    }

    fn into_descriptor(self) -> io::Result<OwnedFd> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "in-memory transport has no OS descriptor",
        ))
    }
}
