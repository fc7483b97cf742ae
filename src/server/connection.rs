use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::ParserConfig;
use crate::http::error::ParseError;
use crate::http::parser::read_request;
use crate::http::response::StatusCode;
use crate::http::writer::ResponseWriter;
use crate::server::handler::{Handler, HandlerError};

static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection, used to tag its log span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One accepted connection: a single request in, a single response out.
pub struct Connection {
    stream: TcpStream,
    parser_config: ParserConfig,
}

impl Connection {
    pub fn new(stream: TcpStream, parser_config: ParserConfig) -> Self {
        Self {
            stream,
            parser_config,
        }
    }

    /// Parses the request, runs `handler`, writes the response and shuts the
    /// stream down. The stream is closed when `self` drops, on every path.
    pub async fn run<H: Handler>(mut self, handler: &H) -> anyhow::Result<()> {
        let result = self.serve(handler).await;
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "shutdown after response failed");
        }
        result
    }

    async fn serve<H: Handler>(&mut self, handler: &H) -> anyhow::Result<()> {
        let request = match read_request(&mut self.stream, &self.parser_config).await {
            Ok(request) => request,
            Err(ParseError::NoRequest) => {
                tracing::debug!("connection closed before sending a request");
                return Ok(());
            }
            Err(e) if e.is_malformed_request() => {
                tracing::warn!(error = %e, "rejecting malformed request");
                let rejection = HandlerError::new(StatusCode::BadRequest, format!("{e}\n"));
                let mut writer = ResponseWriter::new(&mut self.stream);
                if let Err(write_err) = rejection.write_to(&mut writer).await {
                    tracing::debug!(error = %write_err, "failed to send 400 response");
                }
                return Err(anyhow::Error::new(e).context("HTTP parse error"));
            }
            Err(e) => return Err(anyhow::Error::new(e).context("failed to read request")),
        };

        tracing::debug!(
            method = %request.method,
            target = %request.target,
            body_len = request.body.len(),
            "request parsed"
        );

        let mut buffered = ResponseWriter::new(Vec::new());
        match handler.handle(&request, &mut buffered).await {
            Ok(()) => {
                if !buffered.is_complete() {
                    tracing::warn!(state = ?buffered.state(), "handler returned before finishing its response");
                }
                self.stream.write_all(buffered.get_ref()).await?;
            }
            Err(err) => {
                tracing::warn!(status = err.status.as_u16(), "handler returned an error response");
                let mut writer = ResponseWriter::new(&mut self.stream);
                err.write_to(&mut writer).await?;
            }
        }

        self.stream.flush().await?;
        tracing::debug!("response sent");
        Ok(())
    }
}
