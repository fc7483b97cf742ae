//! Connection server.
//!
//! Accepts TCP connections and hands each one to its own task, which reads a
//! single request, runs the [`Handler`] and writes the response before
//! closing the connection.
//!
//! - **`listener`**: [`Server`], the accept loop and controlled close
//! - **`connection`**: The per-connection worker
//! - **`handler`**: The [`Handler`] contract and [`HandlerError`]
//! - **`lifecycle`**: Server state shared with the accept loop

pub mod connection;
pub mod handler;
pub mod lifecycle;
pub mod listener;

pub use handler::{Handler, HandlerError};
pub use lifecycle::{Lifecycle, ServerState};
pub use listener::Server;
