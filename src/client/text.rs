//! UTF-8 helpers on top of the byte operations.
//!
//! Invalid UTF-8 comes back as `Ok(None)`. That includes a multi-byte
//! character split by the buffer limit.

use super::error::Result;
use super::socket::ClientSocket;
use crate::transport::Transport;
use bytes::Bytes;

impl<T: Transport> ClientSocket<T> {
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.send(text.as_bytes()).await
    }

    pub async fn receive_text(&mut self, buffer_size: usize) -> Result<Option<String>> {
        let bytes = self.receive(buffer_size).await?;
        Ok(decode(bytes))
    }

    pub async fn receive_text_until(&mut self, buffer_size: usize, delimiter: &str) -> Result<Option<String>> {
        let bytes = self.receive_until(buffer_size, delimiter.as_bytes()).await?;
        Ok(decode(bytes))
    }
}

fn decode(bytes: Bytes) -> Option<String> {
    String::from_utf8(bytes.into()).ok()
}
