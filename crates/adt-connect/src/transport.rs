//! Establishing the socket to the language server
//!
//! A refused (or immediately reset) connection means nobody is listening.
//! In that case the server is launched, given a moment to bind, and the
//! connection is tried exactly once more. Every other failure is reported
//! as is.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use adt_core::config::ClientConfig;
use adt_core::process::{BackendProcess, LocalBackend};
use adt_core::TransportError;
use tokio::net::TcpStream;

pub struct SocketEstablisher {
    address: String,
    settle_interval: Duration,
    backend: Arc<dyn BackendProcess>,
}

impl SocketEstablisher {
    pub fn new(address: impl Into<String>, backend: Arc<dyn BackendProcess>) -> Self {
        Self {
            address: address.into(),
            settle_interval: Duration::from_secs(1),
            backend,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let backend = LocalBackend::from_env_or(&config.server_executable);
        Self::new(config.server_address.clone(), Arc::new(backend))
            .with_settle_interval(config.settle_interval)
    }

    /// Time given to a freshly launched server before connecting again
    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn backend(&self) -> &Arc<dyn BackendProcess> {
        &self.backend
    }

    pub async fn establish(&self) -> Result<TcpStream, TransportError> {
        if let Some(stream) = self.try_connect().await? {
            return Ok(stream);
        }

        tracing::info!(
            "Language server not listening on {}, starting {:?}",
            self.address,
            self.backend.executable()
        );
        self.backend.spawn_detached()?;
        tokio::time::sleep(self.settle_interval).await;

        self.try_connect()
            .await?
            .ok_or_else(|| TransportError::Unreachable {
                address: self.address.clone(),
            })
    }

    /// `Ok(None)` when the server is not running
    async fn try_connect(&self) -> Result<Option<TcpStream>, TransportError> {
        match TcpStream::connect(&self.address).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!("Failed to set TCP_NODELAY: {}", e);
                }
                Ok(Some(stream))
            }
            Err(e) if is_not_listening(&e) => Ok(None),
            Err(source) => Err(TransportError::Connect {
                address: self.address.clone(),
                source,
            }),
        }
    }
}

fn is_not_listening(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
    )
}
