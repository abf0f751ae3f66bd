//! Buffered input handling for client, replica and master links.
//!
//! Bytes read from a socket are accumulated in a `BytesMut` until at least one full
//! RESP value is available, so frames split across reads and several frames arriving
//! in one read are both handled. The replication handshake also needs to read the
//! `FULLRESYNC` line and the raw snapshot payload, which are not regular RESP values.

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::resp::{RespError, RespValue};

const READ_CHUNK_SIZE: usize = 4096;
const MAX_BUFFERED_WHILE_BLOCKED: usize = 64 * 1024;

/// Errors that can occur while reading from a network stream.
#[derive(Error, Debug, PartialEq)]
pub enum CommandReadError {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("RESP parse error: {0}")]
    RespParseError(#[from] RespError),
    #[error("Invalid response from master")]
    InvalidResponseFromMaster,
}

impl CommandReadError {
    pub fn as_string(&self) -> String {
        match self {
            CommandReadError::RespParseError(err) => {
                RespValue::Error(format!("ERR Protocol error: {}", err)).encode()
            }
            other => RespValue::Error(format!("ERR {}", other)).encode(),
        }
    }
}

/// Reads RESP values from a stream, keeping unread bytes between calls.
pub struct RespReader<R> {
    stream: R,
    buffer: BytesMut,
}

impl<R> RespReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Reads the next complete RESP value from the stream.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((value, length)))` - The value and the number of bytes it occupied on the wire
    /// * `Ok(None)` - The peer closed the connection between two values
    /// * `Err(CommandReadError::RespParseError)` - The peer sent a malformed frame
    /// * `Err(CommandReadError::ConnectionClosed)` - The peer closed the connection mid-frame
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut reader = RespReader::new(read_half);
    /// while let Some((value, _)) = reader.read_value().await? {
    ///     // handle value
    /// }
    /// ```
    pub async fn read_value(&mut self) -> Result<Option<(RespValue, usize)>, CommandReadError> {
        loop {
            if let Some((value, length)) = RespValue::decode(&self.buffer)? {
                self.buffer.advance(length);
                return Ok(Some((value, length)));
            }

            if self.fill().await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }

                return Err(CommandReadError::ConnectionClosed);
            }
        }
    }

    /// Reads a single `\r\n` terminated line and returns it without the terminator.
    pub async fn read_line(&mut self) -> Result<String, CommandReadError> {
        loop {
            if let Some(position) = self.buffer.windows(2).position(|window| window == b"\r\n") {
                let line = self.buffer.split_to(position + 2);
                let line = std::str::from_utf8(&line[..position])
                    .map_err(|_| CommandReadError::InvalidResponseFromMaster)?;

                return Ok(line.to_string());
            }

            if self.fill().await? == 0 {
                return Err(CommandReadError::ConnectionClosed);
            }
        }
    }

    /// Reads a `$<len>\r\n` header followed by exactly `len` raw bytes. Unlike a
    /// bulk string the payload is not followed by a trailing `\r\n`.
    pub async fn read_snapshot_payload(&mut self) -> Result<Vec<u8>, CommandReadError> {
        let header = self.read_line().await?;

        let length = header
            .strip_prefix('$')
            .and_then(|length| length.parse::<usize>().ok())
            .ok_or(CommandReadError::InvalidResponseFromMaster)?;

        while self.buffer.len() < length {
            if self.fill().await? == 0 {
                return Err(CommandReadError::ConnectionClosed);
            }
        }

        Ok(self.buffer.split_to(length).to_vec())
    }

    /// Waits until more bytes arrive or the peer goes away. Bytes read here stay
    /// buffered for the next `read_value` call.
    ///
    /// Returns `true` once the connection is closed. Once enough pipelined input
    /// is buffered this stops reading and never resolves, leaving the rest in the
    /// socket.
    pub async fn wait_for_close(&mut self) -> bool {
        if self.buffer.len() >= MAX_BUFFERED_WHILE_BLOCKED {
            std::future::pending::<()>().await;
        }

        !matches!(self.fill().await, Ok(n) if n > 0)
    }

    async fn fill(&mut self) -> Result<usize, CommandReadError> {
        self.buffer.reserve(READ_CHUNK_SIZE);

        self.stream
            .read_buf(&mut self.buffer)
            .await
            .map_err(|e| CommandReadError::IoError(e.to_string()))
    }
}
