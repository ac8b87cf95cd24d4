pub mod error;
pub mod socket;
mod text;

pub use error::{Result, SocketError};
pub use socket::{ClientSocket, TcpClientSocket};
