//! Demonstration handler.
//!
//! Serves canned HTML pages and streams `/httpbin/...` from an upstream
//! origin back to the client as a chunked body.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::config::DemoConfig;
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::ResponseWriter;
use crate::server::handler::{Handler, HandlerError};

/// Size of each upstream read relayed as one chunk.
const CHUNK_SIZE: usize = 1024;

/// Prevent unbounded growth while looking for the end of upstream headers.
const MAX_UPSTREAM_HEAD: usize = 64 * 1024;

const SUCCESS_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const SERVER_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

pub struct DemoHandler {
    upstream: Url,
    connect_timeout: Duration,
    read_timeout: Duration,
}

/// The parsed head of an upstream response, plus any body bytes read along
/// with it.
struct Upstream {
    stream: TcpStream,
    status: u16,
    headers: Headers,
    leftover: BytesMut,
}

impl DemoHandler {
    pub fn from_config(cfg: &DemoConfig) -> Result<Self> {
        let upstream = Url::parse(&cfg.upstream)
            .with_context(|| format!("invalid demo upstream URL {:?}", cfg.upstream))?;
        Ok(Self {
            upstream,
            connect_timeout: Duration::from_millis(cfg.connect_timeout_ms),
            read_timeout: Duration::from_millis(cfg.read_timeout_ms),
        })
    }

    async fn write_page(
        &self,
        writer: &mut ResponseWriter<Vec<u8>>,
        page: &str,
    ) -> Result<(), HandlerError> {
        let mut headers = default_headers(page.len());
        headers.set("Content-Type", "text/html");

        writer.write_status_line(StatusCode::Ok).await?;
        writer.write_headers(&headers).await?;
        writer.write_body(page.as_bytes()).await?;
        Ok(())
    }

    async fn proxy(
        &self,
        path: &str,
        writer: &mut ResponseWriter<Vec<u8>>,
    ) -> Result<(), HandlerError> {
        tracing::info!(upstream = %self.upstream, path, "Proxying request");

        let Upstream {
            mut stream,
            status,
            headers,
            leftover,
        } = self.open(path).await.map_err(|e| {
            HandlerError::new(
                StatusCode::InternalServerError,
                format!("Error proxying to upstream: {e:#}"),
            )
        })?;

        let status = match status {
            400 => StatusCode::BadRequest,
            500 => StatusCode::InternalServerError,
            _ => StatusCode::Ok,
        };
        let mut out = Headers::new();
        out.set("Transfer-Encoding", "chunked");
        if let Some(content_type) = headers.get("content-type") {
            out.set("Content-Type", content_type);
        }
        out.set("Connection", "close");

        writer.write_status_line(status).await?;
        writer.write_headers(&out).await?;

        if !leftover.is_empty() {
            writer.write_chunked_body(&leftover).await?;
        }

        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match timeout(self.read_timeout, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    tracing::debug!(bytes = n, "Relaying upstream chunk");
                    writer.write_chunked_body(&chunk[..n]).await?;
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Error reading from upstream");
                    break;
                }
                Err(_) => {
                    tracing::warn!(timeout = ?self.read_timeout, "Upstream read timed out");
                    break;
                }
            }
        }

        writer.write_chunked_body_done().await?;
        tracing::info!("Successfully proxied request");
        Ok(())
    }

    /// Connects to the upstream, requests `path` and reads the response head.
    ///
    /// The request is sent as HTTP/1.0 so the upstream answers with a body
    /// delimited by connection close rather than its own chunked framing.
    async fn open(&self, path: &str) -> Result<Upstream> {
        if self.upstream.scheme() != "http" {
            bail!("unsupported upstream scheme {:?}", self.upstream.scheme());
        }
        let host = self.upstream.host_str().context("upstream URL missing host")?;
        let port = self.upstream.port_or_known_default().unwrap_or(80);

        let addr = format!("{}:{}", host, port);
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to upstream")?;

        let base = self.upstream.path().trim_end_matches('/');
        let host_header = match self.upstream.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let request = format!(
            "GET {}{} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
            base, path, host_header
        );
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        let mut buffer = BytesMut::with_capacity(CHUNK_SIZE);
        loop {
            let n = timeout(self.read_timeout, stream.read_buf(&mut buffer))
                .await
                .context("Timed out reading upstream response")??;
            if n == 0 {
                bail!("Connection closed before complete response received");
            }

            if let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = buffer.split_to(end + 4);
                let (status, headers) = parse_upstream_head(&head)?;
                return Ok(Upstream {
                    stream,
                    status,
                    headers,
                    leftover: buffer,
                });
            }

            if buffer.len() > MAX_UPSTREAM_HEAD {
                bail!("Response headers too large");
            }
        }
    }
}

/// Parses a status line and header block ending in a blank line.
fn parse_upstream_head(head: &[u8]) -> Result<(u16, Headers)> {
    let line_end = head
        .windows(2)
        .position(|w| w == b"\r\n")
        .context("Empty response")?;
    let status_line =
        std::str::from_utf8(&head[..line_end]).context("status line is not valid text")?;
    let status = status_line
        .split(' ')
        .nth(1)
        .with_context(|| format!("Invalid status line: {}", status_line))?
        .parse::<u16>()
        .context("Invalid status code")?;

    let mut headers = Headers::new();
    let mut rest = &head[line_end + 2..];
    loop {
        let (consumed, done) = headers.parse(rest)?;
        if done || consumed == 0 {
            break;
        }
        rest = &rest[consumed..];
    }

    Ok((status, headers))
}

impl Handler for DemoHandler {
    async fn handle(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<Vec<u8>>,
    ) -> Result<(), HandlerError> {
        let target = request.target.as_str();

        if let Some(path) = target.strip_prefix("/httpbin").filter(|p| p.starts_with('/')) {
            return self.proxy(path, writer).await;
        }

        match target {
            "/yourproblem" => Err(HandlerError::new(StatusCode::BadRequest, BAD_REQUEST_PAGE)
                .with_header("Content-Type", "text/html")),
            "/myproblem" => Err(
                HandlerError::new(StatusCode::InternalServerError, SERVER_ERROR_PAGE)
                    .with_header("Content-Type", "text/html"),
            ),
            _ => self.write_page(writer, SUCCESS_PAGE).await,
        }
    }
}
