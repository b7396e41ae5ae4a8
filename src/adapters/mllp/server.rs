//! MLLP listener
//!
//! Binds the configured address and spawns one [`Connection`] task per
//! accepted socket. Connections share the parser, registry and publisher
//! through [`ConnectionDeps`]; nothing mutable is shared between them.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::adapters::mllp::connection::{Connection, ConnectionDeps};
use crate::config::TcpConfig;
use crate::domain::{HermesError, Result};

/// The gateway's TCP front end.
pub struct MllpServer {
    listener: TcpListener,
    deps: Arc<ConnectionDeps>,
}

impl MllpServer {
    /// Binds the listener. A bind failure is fatal for the process.
    pub async fn bind(config: &TcpConfig, deps: Arc<ConnectionDeps>) -> Result<MllpServer> {
        let address = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| HermesError::Io(format!("Failed to bind {address}: {e}")))?;
        let local = listener
            .local_addr()
            .map_err(|e| HermesError::Io(e.to_string()))?;
        tracing::info!(address = %local, "MLLP listener started");
        Ok(MllpServer { listener, deps })
    }

    /// The bound address; useful when the configured port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| HermesError::Io(e.to_string()))
    }

    /// Accept loop. Returns when the shutdown signal flips.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let connection =
                                Connection::new(stream, peer.to_string(), self.deps.clone());
                            tokio::spawn(connection.run());
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Shutdown signal received, stopping accept loop");
                        return Ok(());
                    }
                }
            }
        }
    }
}
