//! src/client/error.rs

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SocketError>;

/// Everything that can go wrong on a [`ClientSocket`](crate::ClientSocket).
///
/// Transport failures keep the `io::ErrorKind` they came from so callers can
/// tell a timeout from a reset without parsing the description.
#[derive(Debug, Error)]
pub enum SocketError {
    /* ───────────── State ───────────── */
    #[error("Closed socket")]
    Closed,

    /* ───────────── Connect / Attach ───────────── */
    #[error("{description}")]
    Connection {
        description: String,
        kind: io::ErrorKind,
    },

    /* ───────────── Send / Receive / Flush ───────────── */
    #[error("{description}")]
    Transfer {
        description: String,
        kind: io::ErrorKind,
        /// Bytes moved before the fault. `None` for flush and detach.
        bytes_processed: Option<usize>,
    },
}

impl SocketError {
    pub fn connection(err: &io::Error) -> Self {
        SocketError::Connection {
            description: describe(err),
            kind: err.kind(),
        }
    }

    pub fn transfer(err: &io::Error, bytes_processed: Option<usize>) -> Self {
        SocketError::Transfer {
            description: describe(err),
            kind: err.kind(),
            bytes_processed,
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }

    pub fn bytes_processed(&self) -> Option<usize> {
        match self {
            SocketError::Transfer { bytes_processed, .. } => *bytes_processed,
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<io::ErrorKind> {
        match self {
            SocketError::Closed => None,
            SocketError::Connection { kind, .. } | SocketError::Transfer { kind, .. } => Some(*kind),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SocketError::Closed)
    }
}

/// Renders a transport failure the way every socket error is reported.
pub fn describe(err: &io::Error) -> String {
    format!("TCP Error: {err}")
}
