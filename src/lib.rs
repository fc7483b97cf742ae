//! rawhttp - HTTP/1.1 from raw TCP
//!
//! Incremental request parsing, ordered response writing and a concurrent
//! connection server, built directly on a byte stream.

pub mod config;
pub mod demo;
pub mod http;
pub mod server;
