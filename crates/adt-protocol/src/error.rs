//! Protocol error types

use thiserror::Error;

/// Errors that can occur while framing or decoding messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Header block could not be parsed
    #[error("Invalid frame header: {0}")]
    InvalidHeader(String),

    /// Header block ended without a `Content-Length` field
    #[error("Frame header is missing Content-Length")]
    MissingContentLength,

    /// Header block grew past the limit without a terminator
    #[error("Frame header exceeds {max} bytes")]
    HeaderTooLarge { max: usize },

    /// Payload exceeds maximum size
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Payload is not a valid JSON-RPC message
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
