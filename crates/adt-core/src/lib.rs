//! adt-core: Core types, configuration and persistence for ABAP remote systems
//!
//! This crate provides the shared vocabulary of the workspace: system
//! identifiers and connection records, `adt://` URIs, the error taxonomy,
//! client configuration, the durable state store and the handle on the
//! local language server process.

pub mod config;
pub mod error;
pub mod process;
pub mod store;
pub mod types;
pub mod uri;

pub use error::{
    AdtError, ConfigError, ConnectionError, RpcError, StoreError, TransportError, UriError,
};
pub use types::{ConnectionData, ConnectionTestResult, LinkState, SystemId};
pub use uri::{connection_uri, AdtUri, ADT_URI_SCHEME};
