//! adt-protocol: Wire protocol spoken with the ABAP language server
//!
//! The server is reached over a plain TCP socket. Messages are JSON-RPC 2.0
//! objects, each preceded by an LSP-style `Content-Length` header block.
//! This crate defines the framing, the message model, the typed method
//! contracts and the payload types those methods carry.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod methods;
pub mod node;
pub mod params;

pub use codec::{Frame, FrameCodec};
pub use error::ProtocolError;
pub use frame::{FrameHeader, MAX_HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use message::{
    Message, Notification, Request, RequestId, Response, ResponseError, JSONRPC_VERSION,
};
pub use methods::{
    Authentication, Connect, ConnectParams, ConnectResult, Expand, ExpandParams, ExpandResult,
    Method, ReadSource, ReadSourceParams, ReadSourceResult,
};
pub use node::{FilesystemNode, GroupKind, NodeId, ObjectKind};
pub use params::{
    ApplicationServer, ConnectionParams, HttpParams, MessageServerGroup, ProtocolParams,
    RfcParams, RfcTarget, SncLevel,
};
