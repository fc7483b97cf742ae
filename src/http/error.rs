use crate::http::parser::ParserState;
use crate::http::writer::{WriteOp, WriterState};

/// Errors raised by the growable read buffer.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Growing the buffer would take it past its configured bound.
    #[error("read buffer limit of {limit} bytes exceeded")]
    LimitExceeded { limit: usize },

    /// The underlying transport read failed.
    #[error("transport read failed")]
    Io(#[from] std::io::Error),
}

/// Every way a request can fail to parse.
///
/// All of these abort request construction; no partial request is ever
/// returned alongside one.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The first line of the request was empty.
    #[error("empty request line")]
    EmptyRequestLine,

    /// The attached bytes did not parse as text for the request line.
    #[error("request line is not valid text")]
    RequestLineNotValidText(Vec<u8>),

    /// The request line did not split into method, target and version.
    #[error("invalid request line: {0:?}")]
    InvalidRequestLine(String),

    /// The method was not composed solely of uppercase ASCII letters.
    #[error("invalid method: {0:?}")]
    InvalidMethod(String),

    /// The version token was something other than `HTTP/1.1`.
    #[error("unsupported HTTP version: {0:?}")]
    UnsupportedVersion(String),

    /// A header line had no colon separating name from value.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// A header name was empty, had whitespace before the colon, or
    /// contained non-token characters.
    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),

    /// The `Content-Length` header value is not a non-negative integer.
    #[error("invalid Content-Length header value: {0:?}")]
    InvalidContentLength(String),

    /// More body bytes arrived than `Content-Length` declared.
    #[error("content-length exceeded: declared {declared}, received {received}")]
    ContentLengthExceeded { declared: usize, received: usize },

    /// The parser was asked to consume input after it had finished.
    #[error("request is already complete")]
    AlreadyComplete,

    /// The transport ended before a request line was seen.
    #[error("connection closed before a request was received")]
    NoRequest,

    /// The transport ended before the request was complete (strict framing).
    #[error("connection closed while {state:?}: declared body length {declared:?}, received {received}")]
    IncompleteRequest {
        state: ParserState,
        declared: Option<usize>,
        received: usize,
    },

    /// The read buffer failed to grow or to read from the transport.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl ParseError {
    /// Whether the request bytes themselves were at fault, as opposed to the
    /// transport going away or failing.
    pub fn is_malformed_request(&self) -> bool {
        !matches!(
            self,
            ParseError::NoRequest | ParseError::Buffer(BufferError::Io(_))
        )
    }
}

/// Errors raised by the response writer.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// An operation was called out of its required predecessor state.
    #[error("cannot {operation} while writer is in state {state:?}")]
    OutOfOrder {
        operation: WriteOp,
        state: WriterState,
    },

    /// The status code has no known reason phrase.
    #[error("unknown status code: {0}")]
    UnknownStatusCode(u16),

    /// Writing to the sink failed.
    #[error("failed to write response")]
    Io(#[from] std::io::Error),
}
