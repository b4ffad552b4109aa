//! Peek-without-consume reading.
//!
//! Detection must never advance the client stream: the first bytes the
//! upstream sees have to be byte-identical to the first bytes the client
//! sent. `Lookahead` buffers reads from the underlying stream so they can
//! be examined, then hands the buffer and the stream back for forwarding,
//! where the buffer is replayed ahead of any live bytes.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// A reader that accumulates peeked bytes without consuming them.
pub struct Lookahead<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> Lookahead<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    /// Reads from the stream until `target` bytes are buffered, or the
    /// stream ends. Returns the buffered length, which is less than
    /// `target` only at end of stream. Never reads past `target`.
    pub async fn fill_to(&mut self, target: usize) -> io::Result<usize> {
        let mut chunk = [0u8; 4096];
        while self.buffer.len() < target {
            let want = (target - self.buffer.len()).min(chunk.len());
            let n = self.inner.read(&mut chunk[..want]).await?;
            if n == 0 {
                break;
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
        Ok(self.buffer.len())
    }

    /// All bytes buffered so far; the stream's logical position is still
    /// at the first of them.
    pub fn peeked(&self) -> &[u8] {
        &self.buffer
    }

    /// Releases the buffered bytes and the underlying stream for
    /// forwarding.
    pub fn into_parts(self) -> (Vec<u8>, R) {
        (self.buffer, self.inner)
    }
}
