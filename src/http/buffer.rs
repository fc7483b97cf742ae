//! Growable read buffer.
//!
//! Holds the window of bytes read from the transport that the parser has not
//! consumed yet. The window doubles whenever it fills up, and consumed bytes
//! are dropped from the front.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::error::BufferError;

/// Default starting window, matching the size of a single transport read.
pub const DEFAULT_INITIAL_SIZE: usize = 1024;

#[derive(Debug)]
pub struct ReadBuffer {
    bytes: BytesMut,
    window: usize,
    limit: Option<usize>,
}

impl ReadBuffer {
    /// Creates an unbounded buffer with the given starting window.
    pub fn new(initial_size: usize) -> Self {
        Self::with_limit(initial_size, None)
    }

    /// Creates a buffer that refuses to grow past `limit` bytes.
    pub fn with_limit(initial_size: usize, limit: Option<usize>) -> Self {
        let window = initial_size.max(1);
        Self {
            bytes: BytesMut::with_capacity(window),
            window,
            limit,
        }
    }

    /// The unconsumed bytes, oldest first.
    pub fn available(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Current window size.
    pub fn capacity(&self) -> usize {
        self.window
    }

    pub fn is_full(&self) -> bool {
        self.bytes.len() >= self.window
    }

    /// Drops `n` bytes from the front of the buffer.
    ///
    /// # Panics
    ///
    /// Panics if `n` is larger than the number of available bytes.
    pub fn consume(&mut self, n: usize) {
        self.bytes.advance(n);
    }

    /// Appends `data`, doubling the window until it fits.
    pub fn append(&mut self, data: &[u8]) -> Result<(), BufferError> {
        while self.bytes.len() + data.len() > self.window {
            self.grow()?;
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Performs one read from `reader` into the free part of the window,
    /// doubling the window first if it is full.
    ///
    /// Returns the number of bytes read; zero means end-of-stream.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> Result<usize, BufferError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if self.is_full() {
            self.grow()?;
        }

        let start = self.bytes.len();
        self.bytes.resize(self.window, 0);
        match reader.read(&mut self.bytes[start..]).await {
            Ok(n) => {
                self.bytes.truncate(start + n);
                Ok(n)
            }
            Err(e) => {
                self.bytes.truncate(start);
                Err(BufferError::Io(e))
            }
        }
    }

    fn grow(&mut self) -> Result<(), BufferError> {
        let doubled = self.window.saturating_mul(2);
        let next = match self.limit {
            Some(limit) if self.window >= limit => {
                return Err(BufferError::LimitExceeded { limit });
            }
            Some(limit) => doubled.min(limit),
            None => doubled,
        };

        tracing::trace!(from = self.window, to = next, "growing read buffer");
        self.bytes.reserve(next - self.bytes.len());
        self.window = next;
        Ok(())
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_SIZE)
    }
}
