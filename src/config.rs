use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Socket options shared by every way of opening a [`ClientSocket`](crate::ClientSocket).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SocketConfig {
    pub no_delay: bool,
    pub read_buffer_size: usize,
    /// `0` (the default) sends every `send` straight to the transport, so a
    /// failing `send` reports how far it got. Larger values batch output
    /// until `flush`.
    pub write_buffer_size: usize,
    pub connect_timeout_ms: Option<u64>,
    pub io_timeout_ms: Option<u64>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            no_delay: false,
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            write_buffer_size: 0,
            connect_timeout_ms: None,
            io_timeout_ms: None,
        }
    }
}

impl SocketConfig {
    pub fn new(no_delay: bool) -> Self {
        Self { no_delay, ..Self::default() }
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(saturating_millis(timeout));
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout_ms = Some(saturating_millis(timeout));
        self
    }

    pub fn no_delay(&self) -> bool {
        self.no_delay
    }

    pub fn read_buffer_size(&self) -> usize {
        // tokio's BufReader cannot make progress with an empty buffer
        self.read_buffer_size.max(1)
    }

    pub fn write_buffer_size(&self) -> usize {
        self.write_buffer_size
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}

fn saturating_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
