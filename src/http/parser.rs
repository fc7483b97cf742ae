//! Incremental request parser.
//!
//! [`RequestParser`] consumes whatever bytes are buffered and reports how many
//! it used. Consuming zero bytes without changing state means it needs more
//! input, so the same parser handles a request delivered one byte at a time
//! or all at once.

use serde::Deserialize;
use tokio::io::AsyncRead;

use crate::config::ParserConfig;
use crate::http::buffer::ReadBuffer;
use crate::http::error::ParseError;
use crate::http::headers::Headers;
use crate::http::request::{HTTP_VERSION, Method, Request};

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

/// How end-of-stream is treated before the request is complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFraming {
    /// End-of-stream completes the request, even when a declared
    /// `Content-Length` has not been reached yet.
    #[default]
    Lenient,
    /// End-of-stream before the request is complete is an error.
    Strict,
}

#[derive(Debug)]
struct RequestLine {
    method: Method,
    target: String,
    version: String,
}

/// Parser state for a single in-flight request.
#[derive(Debug)]
pub struct RequestParser {
    state: ParserState,
    framing: BodyFraming,
    request_line: Option<RequestLine>,
    headers: Headers,
    body: Vec<u8>,
    body_bytes_read: usize,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_framing(BodyFraming::default())
    }

    pub fn with_framing(framing: BodyFraming) -> Self {
        Self {
            state: ParserState::Initialized,
            framing,
            request_line: None,
            headers: Headers::new(),
            body: Vec::new(),
            body_bytes_read: 0,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Headers parsed so far.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body_bytes_read(&self) -> usize {
        self.body_bytes_read
    }

    /// Feeds buffered bytes to the parser, returning how many were consumed.
    ///
    /// Keeps parsing until the request is done or no further progress can be
    /// made with `data`. The caller must drop the consumed bytes and present
    /// the remainder, plus any newly read bytes, on the next call.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut total = 0;
        loop {
            let before = self.state;
            let consumed = self.parse_single(&data[total..])?;
            total += consumed;

            if self.is_done() || (consumed == 0 && self.state == before) {
                return Ok(total);
            }
        }
    }

    /// Completes parsing, either because the parser reached `Done` or because
    /// the transport reported end-of-stream.
    pub fn finish(mut self) -> Result<Request, ParseError> {
        if !self.is_done() {
            if self.request_line.is_none() {
                return Err(ParseError::NoRequest);
            }
            if self.framing == BodyFraming::Strict {
                return Err(ParseError::IncompleteRequest {
                    state: self.state,
                    declared: self.content_length().ok().flatten(),
                    received: self.body_bytes_read,
                });
            }
            tracing::debug!(
                state = ?self.state,
                received = self.body_bytes_read,
                "end of stream before request completed, accepting as done"
            );
            self.state = ParserState::Done;
        }

        let line = self.request_line.ok_or(ParseError::NoRequest)?;
        Ok(Request {
            method: line.method,
            target: line.target,
            version: line.version,
            headers: self.headers,
            body: self.body,
        })
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParserState::Initialized => {
                let Some((line, consumed)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                tracing::trace!(method = %line.method, target = %line.target, "parsed request line");
                self.request_line = Some(line);
                self.state = ParserState::ParsingHeaders;
                Ok(consumed)
            }
            ParserState::ParsingHeaders => {
                let (consumed, done) = self.headers.parse(data)?;
                if done {
                    tracing::trace!(headers = self.headers.len(), "parsed headers");
                    self.state = ParserState::ParsingBody;
                }
                Ok(consumed)
            }
            ParserState::ParsingBody => {
                let Some(declared) = self.content_length()? else {
                    self.state = ParserState::Done;
                    return Ok(data.len());
                };

                self.body.extend_from_slice(data);
                self.body_bytes_read += data.len();
                if self.body_bytes_read > declared {
                    return Err(ParseError::ContentLengthExceeded {
                        declared,
                        received: self.body_bytes_read,
                    });
                }
                if self.body_bytes_read == declared {
                    self.state = ParserState::Done;
                }
                Ok(data.len())
            }
            ParserState::Done => Err(ParseError::AlreadyComplete),
        }
    }

    fn content_length(&self) -> Result<Option<usize>, ParseError> {
        let Some(value) = self.headers.get("content-length") else {
            return Ok(None);
        };
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidContentLength(value.to_string()));
        }
        value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ParseError::InvalidContentLength(value.to_string()))
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses the request line if a full line is buffered.
///
/// Returns the line together with the bytes it used, CRLF included.
fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(idx) = data.windows(CRLF.len()).position(|w| w == CRLF) else {
        return Ok(None);
    };
    if idx == 0 {
        return Err(ParseError::EmptyRequestLine);
    }

    let text = std::str::from_utf8(&data[..idx])
        .map_err(|_| ParseError::RequestLineNotValidText(data[..idx].to_vec()))?;
    let parts: Vec<&str> = text.split(' ').collect();
    let [method, target, version] = parts[..] else {
        return Err(ParseError::InvalidRequestLine(text.to_string()));
    };

    let method = Method::parse(method).ok_or_else(|| ParseError::InvalidMethod(method.to_string()))?;
    if target.is_empty() {
        return Err(ParseError::InvalidRequestLine(text.to_string()));
    }
    if version != HTTP_VERSION {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    let line = RequestLine {
        method,
        target: target.to_string(),
        version: version.to_string(),
    };
    Ok(Some((line, idx + CRLF.len())))
}

/// Reads one request from `reader`.
///
/// Every read is appended to a growable buffer and handed to the parser until
/// it is done; consumed bytes are compacted out between reads. End-of-stream
/// finishes the request according to the configured [`BodyFraming`].
pub async fn read_request<R>(reader: &mut R, config: &ParserConfig) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = ReadBuffer::with_limit(config.initial_buffer_size, config.max_buffer_size);
    let mut parser = RequestParser::with_framing(config.body_framing);

    while !parser.is_done() {
        let n = buffer.fill_from(reader).await?;
        if n == 0 {
            break;
        }

        let consumed = parser.parse(buffer.available())?;
        buffer.consume(consumed);
    }

    parser.finish()
}
