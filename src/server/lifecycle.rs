//! Server lifecycle state shared between the server handle and its accept
//! loop.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    Starting,
    Running,
    Closing,
    Closed,
}

/// Shared, observable server state.
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<ServerState>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Starting);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ServerState {
        *self.tx.borrow()
    }

    /// Moves to `state`. Transitions never go backwards; an earlier state is
    /// ignored.
    pub fn set(&self, state: ServerState) {
        self.tx.send_if_modified(|current| {
            if state > *current {
                tracing::debug!(from = ?*current, to = ?state, "server state change");
                *current = state;
                true
            } else {
                false
            }
        });
    }

    /// Whether a close has been requested.
    pub fn is_closing(&self) -> bool {
        self.state() >= ServerState::Closing
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
