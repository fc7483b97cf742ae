//! Order-enforcing response writer.
//!
//! Every operation is gated on the writer's current state, so a response can
//! only go out as status line, headers, then either one body or a sequence of
//! chunks closed by the terminating chunk:
//!
//! ```text
//! Initialized ─► StatusLineWritten ─► HeadersWritten ─┬─► BodyWritten
//!                                                     │        ▲
//!                                                     └─► WritingChunkedBody
//!                                                          (repeat) ─┘ done
//! ```

use std::fmt;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::WriterError;
use crate::http::headers::Headers;
use crate::http::request::HTTP_VERSION;
use crate::http::response::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Initialized,
    StatusLineWritten,
    HeadersWritten,
    WritingChunkedBody,
    BodyWritten,
}

/// The operations a [`ResponseWriter`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    StatusLine,
    Headers,
    Body,
    ChunkedBody,
    ChunkedBodyDone,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteOp::StatusLine => "write status line",
            WriteOp::Headers => "write headers",
            WriteOp::Body => "write body",
            WriteOp::ChunkedBody => "write chunked body",
            WriteOp::ChunkedBodyDone => "finish chunked body",
        };
        f.write_str(name)
    }
}

impl WriterState {
    /// The state reached by applying `op` in this state.
    pub fn transition(self, op: WriteOp) -> Result<WriterState, WriterError> {
        use WriterState::*;

        let out_of_order = Err(WriterError::OutOfOrder {
            operation: op,
            state: self,
        });
        match op {
            WriteOp::StatusLine => match self {
                Initialized => Ok(StatusLineWritten),
                StatusLineWritten | HeadersWritten | WritingChunkedBody | BodyWritten => out_of_order,
            },
            WriteOp::Headers => match self {
                StatusLineWritten => Ok(HeadersWritten),
                Initialized | HeadersWritten | WritingChunkedBody | BodyWritten => out_of_order,
            },
            WriteOp::Body => match self {
                HeadersWritten => Ok(BodyWritten),
                Initialized | StatusLineWritten | WritingChunkedBody | BodyWritten => out_of_order,
            },
            WriteOp::ChunkedBody => match self {
                HeadersWritten | WritingChunkedBody => Ok(WritingChunkedBody),
                Initialized | StatusLineWritten | BodyWritten => out_of_order,
            },
            WriteOp::ChunkedBodyDone => match self {
                HeadersWritten | WritingChunkedBody => Ok(BodyWritten),
                Initialized | StatusLineWritten | BodyWritten => out_of_order,
            },
        }
    }
}

/// Writes one response to `sink` in wire order.
///
/// Bytes written before an error stay written; there is no rollback.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::Initialized,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Whether a full response has been written.
    pub fn is_complete(&self) -> bool {
        self.state == WriterState::BodyWritten
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Emits `HTTP/1.1 <code> <reason>\r\n`.
    pub async fn write_status_line(&mut self, code: impl Into<u16>) -> Result<(), WriterError> {
        let next = self.state.transition(WriteOp::StatusLine)?;
        let code = code.into();
        let status = StatusCode::from_u16(code).ok_or(WriterError::UnknownStatusCode(code))?;

        let line = format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase()
        );
        self.sink.write_all(line.as_bytes()).await?;
        self.advance(next);
        Ok(())
    }

    /// Emits one `Name: Value\r\n` line per header, then the blank line.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), WriterError> {
        let next = self.state.transition(WriteOp::Headers)?;

        let mut buf = Vec::new();
        for (name, value) in headers {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(b"\r\n");

        self.sink.write_all(&buf).await?;
        self.advance(next);
        Ok(())
    }

    /// Writes `body` verbatim.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<(), WriterError> {
        let next = self.state.transition(WriteOp::Body)?;
        self.sink.write_all(body).await?;
        self.advance(next);
        Ok(())
    }

    /// Writes `data` as one chunk: hex size, CRLF, the bytes, CRLF.
    ///
    /// Returns the number of payload bytes written. An empty `data` still
    /// emits a (zero-sized) chunk.
    pub async fn write_chunked_body(&mut self, data: &[u8]) -> Result<usize, WriterError> {
        let next = self.state.transition(WriteOp::ChunkedBody)?;

        let mut buf = Vec::with_capacity(data.len() + 16);
        buf.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
        buf.extend_from_slice(data);
        buf.extend_from_slice(b"\r\n");

        self.sink.write_all(&buf).await?;
        self.advance(next);
        Ok(data.len())
    }

    /// Writes the terminating `0\r\n\r\n` chunk.
    pub async fn write_chunked_body_done(&mut self) -> Result<(), WriterError> {
        let next = self.state.transition(WriteOp::ChunkedBodyDone)?;
        self.sink.write_all(b"0\r\n\r\n").await?;
        self.advance(next);
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), WriterError> {
        self.sink.flush().await?;
        Ok(())
    }

    fn advance(&mut self, next: WriterState) {
        tracing::trace!(from = ?self.state, to = ?next, "response writer transition");
        self.state = next;
    }
}
