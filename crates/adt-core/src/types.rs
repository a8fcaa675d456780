//! Core domain types

use adt_protocol::ConnectionParams;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::uri;

/// Identifier of a remote system, e.g. `A4H`
///
/// System ids are case-insensitive and always held in uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SystemId(String);

impl SystemId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SystemId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SystemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<SystemId> for String {
    fn from(id: SystemId) -> Self {
        id.0
    }
}

impl AsRef<str> for SystemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether a catalog entry currently has an active connection
///
/// Never persisted. Every load starts out disconnected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// A user declared connection to a remote system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionData {
    /// Unique key in the catalog
    pub name: String,
    pub system_id: SystemId,
    pub params: ConnectionParams,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landscape_provider_url: Option<String>,
    #[serde(skip)]
    pub state: LinkState,
}

impl ConnectionData {
    pub fn new(name: impl Into<String>, system_id: impl Into<SystemId>, params: ConnectionParams) -> Self {
        Self {
            name: name.into(),
            system_id: system_id.into(),
            params,
            description: String::new(),
            landscape_provider_url: None,
            state: LinkState::Disconnected,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// `adt://<SYSTEM-ID>`, the workspace folder URI for this system
    pub fn uri(&self) -> String {
        uri::connection_uri(&self.system_id)
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }
}

/// Outcome of a connection test, never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}

impl ConnectionTestResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
