//! Nodes of the repository tree as reported by `filesystem/expand`
//!
//! ```json
//! {"id":{"idx":1,"version":1},"kind":"group","name":"A4H","group":"SYSTEM"}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server assigned node handle
///
/// `version` changes when the server recycles an index, so a stale handle
/// never silently addresses a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub idx: u64,
    pub version: u64,
}

impl NodeId {
    /// Handle of the system root every server session starts from
    pub const SYSTEM_ROOT: NodeId = NodeId { idx: 1, version: 1 };

    pub fn new(idx: u64, version: u64) -> Self {
        Self { idx, version }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.idx, self.version)
    }
}

/// Any node in the repository tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FilesystemNode {
    /// Client or server defined grouping, including the system root
    Group {
        id: NodeId,
        name: String,
        group: GroupKind,
    },
    /// Grouping by an object attribute, e.g. all objects owned by a user
    Facet {
        id: NodeId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },
    /// An object in the repository
    #[serde(rename_all = "camelCase")]
    RepositoryObject {
        id: NodeId,
        name: String,
        object_kind: ObjectKind,
    },
}

impl FilesystemNode {
    /// Root node for a system, named after its id
    pub fn system_root(system_id: impl Into<String>) -> Self {
        Self::Group {
            id: NodeId::SYSTEM_ROOT,
            name: system_id.into(),
            group: GroupKind::System,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Self::Group { id, .. } | Self::Facet { id, .. } | Self::RepositoryObject { id, .. } => {
                *id
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Group { name, .. }
            | Self::Facet { name, .. }
            | Self::RepositoryObject { name, .. } => name,
        }
    }

    /// Whether the node can have children
    pub fn is_expandable(&self) -> bool {
        match self {
            Self::Group { .. } | Self::Facet { .. } => true,
            Self::RepositoryObject { object_kind, .. } => object_kind.is_package(),
        }
    }
}

/// Predefined groups below a system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupKind {
    System,
    LocalObjects,
    SystemLibrary,
    Favorites,
}

/// Repository object type, e.g. `PROG/P`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Package,
    Program,
    Include,
    Interface,
    Class,
    Other(String),
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Package => "DEVC/K",
            Self::Program => "PROG/P",
            Self::Include => "PROG/I",
            Self::Interface => "INTF/OI",
            Self::Class => "CLAS/OC",
            Self::Other(kind) => kind,
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, Self::Package)
    }

    /// File extension for the object's source, `None` for packages
    ///
    /// Unknown kinds use the lowercased first four characters of the type.
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::Package => None,
            Self::Program => Some("prog".into()),
            Self::Include => Some("incl".into()),
            Self::Interface => Some("intf".into()),
            Self::Class => Some("clas".into()),
            Self::Other(kind) => Some(kind.chars().take(4).collect::<String>().to_lowercase()),
        }
    }
}

impl From<String> for ObjectKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "DEVC/K" => Self::Package,
            "PROG/P" => Self::Program,
            "PROG/I" => Self::Include,
            "INTF/OI" => Self::Interface,
            "CLAS/OC" => Self::Class,
            _ => Self::Other(kind),
        }
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
