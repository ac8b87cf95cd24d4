use super::{Connector, Transport};
use crate::config::SocketConfig;
use crate::rapid_error;
use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use tokio::net::TcpStream;

impl Transport for TcpStream {
    fn raw_descriptor(&self) -> RawFd {
        self.as_raw_fd()
    }

    fn into_descriptor(self) -> io::Result<OwnedFd> {
        // Deregisters from the reactor; the new owner gets a plain blocking socket.
        let stream = self.into_std()?;
        // The descriptor is handed over even if the mode cannot be restored.
        if let Err(e) = stream.set_nonblocking(false) {
            rapid_error!("Descriptor {} stays non-blocking after detach: {}", stream.as_raw_fd(), e);
        }
        Ok(OwnedFd::from(stream))
    }
}

impl Connector for TcpStream {
    async fn connect(addr: SocketAddr, config: &SocketConfig) -> io::Result<Self> {
        let stream = match config.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??,
            None => TcpStream::connect(addr).await?,
        };
        stream.set_nodelay(config.no_delay())?;
        Ok(stream)
    }

    fn attach(fd: OwnedFd, config: &SocketConfig) -> io::Result<Self> {
        // Registering with the reactor needs a runtime; without one tokio would panic.
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(io::Error::other("no tokio runtime to register the descriptor with"));
        }

        let stream = std::net::TcpStream::from(fd);
        // Rejects anything that is not a connected stream socket.
        stream.peer_addr()?;
        stream.set_nonblocking(true)?;

        let stream = TcpStream::from_std(stream)?;
        stream.set_nodelay(config.no_delay())?;
        Ok(stream)
    }
}
