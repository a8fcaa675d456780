//! Filesystem error types

use adt_core::{RpcError, SystemId, UriError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VfsError {
    /// Nothing at that path, or the path is not writable
    #[error("{0}: file not found")]
    FileNotFound(String),

    /// File operation on a directory
    #[error("{0} is a directory")]
    FileIsADirectory(String),

    /// Directory operation on a file
    #[error("{0} is not a directory")]
    FileNotADirectory(String),

    /// The owning system has no active connection
    #[error("{0} is not connected")]
    Unavailable(SystemId),

    #[error(transparent)]
    InvalidUri(#[from] UriError),

    /// The language server rejected the request
    #[error(transparent)]
    Rpc(#[from] RpcError),
}
