//! HTTP/1.1 message framing over a raw byte stream.
//!
//! This module parses one request per connection and serializes the matching
//! response, without any HTTP library underneath.
//!
//! # Architecture
//!
//! - **`buffer`**: Growable read buffer between the transport and the parser
//! - **`headers`**: Case-insensitive header collection with merge-on-insert
//! - **`parser`**: Incremental request parser and the `read_request` driver
//! - **`request`**: Parsed request representation
//! - **`response`**: Status codes and default response headers
//! - **`writer`**: Response writer enforcing wire order
//! - **`error`**: Error types for all of the above
//!
//! # Request Parser State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │   Initialized    │ ← Wait for the request line
//!        └──────┬───────────┘
//!               │ METHOD SP TARGET SP HTTP/1.1 CRLF
//!               ▼
//!        ┌──────────────────┐
//!        │  ParsingHeaders  │ ← One `Name: Value` line per step
//!        └──────┬───────────┘
//!               │ blank CRLF
//!               ▼
//!        ┌──────────────────┐
//!        │   ParsingBody    │ ← Until Content-Length bytes are read
//!        └──────┬───────────┘
//!               │ body complete, no Content-Length, or end of stream
//!               ▼
//!        ┌──────────────────┐
//!        │       Done       │
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rawhttp::config::ParserConfig;
//! use rawhttp::http::parser::read_request;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:42069").await?;
//!     let (mut socket, _addr) = listener.accept().await?;
//!     let request = read_request(&mut socket, &ParserConfig::default()).await?;
//!     println!("{} {}", request.method, request.target);
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod error;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
