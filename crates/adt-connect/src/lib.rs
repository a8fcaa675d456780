//! adt-connect: Connection lifecycle management for remote ABAP systems
//!
//! Systems are declared in a durable catalog and connected through the
//! local language server, which holds the actual logon sessions. The
//! [`ConnectionManager`] owns the catalog and the set of active
//! connections, parks them when the host shuts down and restores them on
//! the next start.

pub mod connection;
pub mod credentials;
pub mod event;
pub mod manager;
pub mod rpc;
pub mod transport;
pub mod workspace;

pub use connection::{Connection, ConnectionState};
pub use credentials::{CredentialProvider, EnvCredentials, StaticCredentials};
pub use event::{ConnectionEvent, ConnectionEventKind};
pub use manager::{ConnectionManager, RestoreReport};
pub use rpc::{ErrorAction, ErrorHandler, LogErrors, RpcClient};
pub use transport::SocketEstablisher;
pub use workspace::{FileWorkspace, MemoryWorkspace, Workspace, WorkspaceFolder};
