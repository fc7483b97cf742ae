use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Instrument, info};

use crate::config::{Config, ParserConfig};
use crate::server::connection::{Connection, ConnectionId};
use crate::server::handler::Handler;
use crate::server::lifecycle::{Lifecycle, ServerState};

/// A running server: a bound listener plus the background accept loop.
pub struct Server {
    local_addr: SocketAddr,
    lifecycle: Lifecycle,
    accept_loop: JoinHandle<()>,
}

impl Server {
    /// Binds the configured port and starts accepting connections, one
    /// worker task per connection.
    pub async fn serve<H: Handler>(cfg: &Config, handler: H) -> anyhow::Result<Self> {
        let lifecycle = Lifecycle::new();
        let addr = cfg.server.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("error listening on {addr}"))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        lifecycle.set(ServerState::Running);
        let accept_loop = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            cfg.parser.clone(),
            cfg.server.shutdown_grace(),
            lifecycle.clone(),
        ));

        Ok(Self {
            local_addr,
            lifecycle,
            accept_loop,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        self.lifecycle.state()
    }

    /// Stops accepting and closes the listener, then waits up to the
    /// configured grace period for in-flight connections. Connections still
    /// running after that are left to finish in the background.
    pub async fn close(self) -> anyhow::Result<()> {
        self.lifecycle.set(ServerState::Closing);
        let joined = self.accept_loop.await;
        self.lifecycle.set(ServerState::Closed);
        joined.context("accept loop panicked")?;
        info!("Server closed");
        Ok(())
    }
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    parser_config: ParserConfig,
    shutdown_grace: Duration,
    lifecycle: Lifecycle,
) {
    let mut state_changes = lifecycle.subscribe();
    let mut workers = JoinSet::new();

    while !lifecycle.is_closing() {
        tokio::select! {
            _ = state_changes.changed() => continue,

            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    let id = ConnectionId::new();
                    info!("Accepted connection {} from {}", id, peer);

                    let conn = Connection::new(socket, parser_config.clone());
                    let handler = Arc::clone(&handler);
                    let span = tracing::info_span!("conn", id = id.as_u64(), %peer);
                    workers.spawn(
                        async move {
                            if let Err(e) = conn.run(handler.as_ref()).await {
                                tracing::error!("Connection error from {}: {:#}", peer, e);
                            }
                        }
                        .instrument(span),
                    );
                }
                Err(e) => {
                    if lifecycle.is_closing() {
                        break;
                    }
                    tracing::warn!(error = %e, "error accepting connection");
                }
            },

            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "connection worker failed");
                }
            }
        }
    }

    drop(listener);
    info!(in_flight = workers.len(), "Listener closed, draining connections");
    let drain = async {
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "connection worker failed");
            }
        }
    };
    if tokio::time::timeout(shutdown_grace, drain).await.is_err() {
        tracing::warn!(
            remaining = workers.len(),
            "Shutdown grace period elapsed, leaving connections to finish"
        );
        workers.detach_all();
    }
}
