//! A live connection to one remote system
//!
//! A `Connection` is only handed out once the server accepted the logon,
//! so holding one means the session existed at that point. It does not
//! mean it still does: the socket may close at any time, which moves the
//! state to `Disconnected` for good.

use std::fmt;
use std::sync::Arc;

use adt_core::{ConnectionData, ConnectionError, RpcError, SystemId};
use adt_protocol::{Authentication, Connect, ConnectParams, ConnectResult, Method, ProtocolError};
use tokio::sync::watch;

use crate::rpc::{ErrorAction, ErrorHandler, LogErrors, RpcClient};
use crate::transport::SocketEstablisher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Connected,
    /// Terminal, a new `Connection` is needed to talk to the system again
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

pub struct Connection {
    data: ConnectionData,
    client: RpcClient,
    outcome: ConnectResult,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl Connection {
    /// Log on to the system through the language server
    ///
    /// On failure the socket is dropped and nothing is left behind.
    pub async fn connect(
        data: ConnectionData,
        authentication: Authentication,
        establisher: &SocketEstablisher,
    ) -> Result<Self, ConnectionError> {
        Self::open(data, authentication, establisher, false).await
    }

    /// Reattach to a session the server still holds
    ///
    /// Any failure, including an expired session, yields `None`.
    pub async fn restore(
        data: ConnectionData,
        authentication: Authentication,
        establisher: &SocketEstablisher,
    ) -> Option<Self> {
        let system_id = data.system_id.clone();
        match Self::open(data, authentication, establisher, true).await {
            Ok(connection) => Some(connection),
            Err(e) => {
                tracing::debug!("Restoring {} failed: {}", system_id, e);
                None
            }
        }
    }

    async fn open(
        data: ConnectionData,
        authentication: Authentication,
        establisher: &SocketEstablisher,
        restore: bool,
    ) -> Result<Self, ConnectionError> {
        let state = Arc::new(watch::Sender::new(ConnectionState::Uninitialized));
        state.send_replace(ConnectionState::Connecting);

        let handler = Arc::new(StateTracker {
            system_id: data.system_id.clone(),
            state: Arc::clone(&state),
        });
        let client = match RpcClient::start(establisher, handler).await {
            Ok(client) => client,
            Err(e) => {
                state.send_replace(ConnectionState::Disconnected);
                return Err(e.into());
            }
        };

        let params = ConnectParams {
            params: data.params.clone(),
            system_id: data.system_id.to_string(),
            restore,
            authentication,
        };
        let outcome = match client.invoke::<Connect>(params).await {
            Ok(outcome) => outcome,
            Err(e) => {
                client.kill();
                state.send_replace(ConnectionState::Disconnected);
                return Err(e.into());
            }
        };

        state.send_replace(ConnectionState::Connected);
        tracing::info!(
            "Connected to {} at {} ({:?})",
            data.system_id,
            data.params.endpoint(),
            outcome
        );

        Ok(Self {
            data,
            client,
            outcome,
            state,
        })
    }

    pub fn data(&self) -> &ConnectionData {
        &self.data
    }

    pub fn system_id(&self) -> &SystemId {
        &self.data.system_id
    }

    /// What the server did to satisfy the logon
    pub fn outcome(&self) -> ConnectResult {
        self.outcome
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected && self.client.is_running()
    }

    pub async fn invoke<M: Method>(&self, params: M::Params) -> Result<M::Result, RpcError> {
        self.client.invoke::<M>(params).await
    }

    /// Close the socket. The server keeps the session until it expires.
    pub async fn disconnect(&self) {
        self.client.stop().await;
        self.state.send_replace(ConnectionState::Disconnected);
        tracing::info!("Disconnected from {}", self.data.system_id);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("system_id", &self.data.system_id)
            .field("name", &self.data.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Moves the connection to `Disconnected` when the server hangs up
struct StateTracker {
    system_id: SystemId,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl ErrorHandler for StateTracker {
    fn error(&self, error: &ProtocolError) -> ErrorAction {
        LogErrors.error(error)
    }

    fn closed(&self) {
        tracing::warn!("Language server closed the connection to {}", self.system_id);
        self.state.send_replace(ConnectionState::Disconnected);
    }
}
