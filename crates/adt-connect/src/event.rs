//! Catalog and connection change notifications

use adt_core::ConnectionData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEventKind {
    Added,
    Deleted,
    Connected,
    Disconnected,
}

/// Published after the change is applied and persisted
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub connection: ConnectionData,
}

impl ConnectionEvent {
    pub fn new(kind: ConnectionEventKind, connection: ConnectionData) -> Self {
        Self { kind, connection }
    }
}
