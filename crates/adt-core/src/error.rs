//! Core error types

use adt_protocol::{ProtocolError, ResponseError};
use std::path::PathBuf;
use thiserror::Error;

use crate::types::SystemId;

/// Top-level error type for the workspace
#[derive(Error, Debug)]
pub enum AdtError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State persistence error
    #[error("State error: {0}")]
    Store(#[from] StoreError),

    /// Malformed `adt://` URI
    #[error("URI error: {0}")]
    Uri(#[from] UriError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reaching the language server socket
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connecting failed for a reason other than the server being down
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The server executable could not be launched
    #[error("Failed to start language server {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Still refused after launching the server and waiting
    #[error("Language server at {address} is not reachable")]
    Unreachable { address: String },

    /// The socket closed while a call was outstanding
    #[error("Connection to the language server closed")]
    Closed,

    /// The peer sent something that is not a valid frame
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Failures of a single remote call
#[derive(Error, Debug)]
pub enum RpcError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Error object reported by the server, shown verbatim
    #[error("{0}")]
    Backend(#[from] ResponseError),

    /// The server answered with a result of the wrong shape
    #[error("Unexpected result for {method}: {source}")]
    InvalidResult {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Connection lifecycle errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// A connection for the system is active or being established
    #[error("Connection to {0} is already active")]
    AlreadyConnected(SystemId),

    /// No active connection for the system
    #[error("Not connected to {0}")]
    NotConnected(SystemId),

    /// Catalog already holds a connection with that name
    #[error("A connection named {0:?} already exists")]
    DuplicateName(String),

    /// Catalog has no connection with that name
    #[error("No connection named {0:?}")]
    NotFound(String),

    /// Connections are being parked, no new ones are admitted meanwhile
    #[error("Cannot connect to {0} while connections are being parked")]
    Parking(SystemId),

    /// The connection must be disconnected before it can be removed
    #[error("Connection {0:?} is active, disconnect it first")]
    StillConnected(String),

    /// Logon material could not be obtained
    #[error("No credentials for {0}")]
    Credentials(String),

    /// Workspace folders could not be updated
    #[error("Workspace update failed: {0}")]
    Workspace(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Failed to persist state: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Durable state errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The blocking write task was cancelled or panicked
    #[error("State write did not complete: {0}")]
    Interrupted(String),

    /// A writer panicked while holding the in-memory state
    #[error("State lock poisoned")]
    Poisoned,
}

/// `adt://` URI errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("Unsupported URI scheme in {0:?}")]
    Scheme(String),

    #[error("URI {0:?} names no system")]
    MissingSystem(String),

    #[error("URI segment {0:?} is not valid UTF-8 once decoded")]
    Encoding(String),
}
