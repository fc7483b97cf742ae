use std::future::Future;

use tokio::io::AsyncWrite;

use crate::http::error::WriterError;
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::ResponseWriter;

/// Application logic invoked once per parsed request.
///
/// The handler either writes a complete response through `writer` and returns
/// `Ok`, or returns a [`HandlerError`], in which case anything it wrote is
/// discarded and the error is sent as the response instead.
pub trait Handler: Send + Sync + 'static {
    fn handle(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<Vec<u8>>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;
}

/// A structured error response returned by a [`Handler`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
    /// Overrides applied on top of the default headers.
    pub headers: Headers,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Writes the error as a complete response.
    pub async fn write_to<W>(&self, writer: &mut ResponseWriter<W>) -> Result<(), WriterError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut headers = default_headers(self.message.len());
        for (name, value) in &self.headers {
            headers.set(name, value);
        }

        writer.write_status_line(self.status).await?;
        writer.write_headers(&headers).await?;
        writer.write_body(self.message.as_bytes()).await?;
        Ok(())
    }
}

impl From<WriterError> for HandlerError {
    fn from(err: WriterError) -> Self {
        HandlerError::new(StatusCode::InternalServerError, err.to_string())
    }
}
