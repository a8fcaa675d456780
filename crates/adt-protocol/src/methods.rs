//! Typed contracts of the server methods the client calls

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::node::{FilesystemNode, NodeId};
use crate::params::ConnectionParams;

/// A request/response pair known at compile time
pub trait Method {
    const NAME: &'static str;
    type Params: Serialize + DeserializeOwned + Send + Sync;
    type Result: Serialize + DeserializeOwned + Send;
}

/// `connection/connect`: open or restore a server side session
pub enum Connect {}

impl Method for Connect {
    const NAME: &'static str = "connection/connect";
    type Params = ConnectParams;
    type Result = ConnectResult;
}

/// `filesystem/expand`: list the children of a node
pub enum Expand {}

impl Method for Expand {
    const NAME: &'static str = "filesystem/expand";
    type Params = ExpandParams;
    type Result = ExpandResult;
}

/// `filesystem/source`: read the source of an object node
pub enum ReadSource {}

impl Method for ReadSource {
    const NAME: &'static str = "filesystem/source";
    type Params = ReadSourceParams;
    type Result = ReadSourceResult;
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    #[serde(flatten)]
    pub params: ConnectionParams,
    pub system_id: String,
    /// Reattach to a session the server still holds instead of logging on
    #[serde(default)]
    pub restore: bool,
    pub authentication: Authentication,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("system_id", &self.system_id)
            .field("restore", &self.restore)
            .field("endpoint", &self.params.endpoint())
            .field("authentication", &self.authentication)
            .finish()
    }
}

/// Logon material for a system
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Authentication {
    Password { username: String, password: String },
    SecurityToken { token: String },
    Sso2 { ticket: String },
}

impl Authentication {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Secrets never reach logs.
impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::SecurityToken { .. } => f.write_str("SecurityToken(<redacted>)"),
            Self::Sso2 { .. } => f.write_str("Sso2(<redacted>)"),
        }
    }
}

/// Outcome of `connection/connect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConnectResult {
    /// The server already held a session for this system
    AlreadyConnected,
    /// A new session was opened
    Created,
    /// A previously held session was reattached
    Restored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandParams {
    pub id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandResult {
    pub children: Vec<FilesystemNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSourceParams {
    pub id: NodeId,
    /// `adt://` URI the source is requested for
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSourceResult {
    pub content: String,
}
