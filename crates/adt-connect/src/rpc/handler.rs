//! Transport error policy

use adt_protocol::ProtocolError;

/// What to do after a transport level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Log and keep the session
    Continue,
    /// Close the socket and fail outstanding calls
    Shutdown,
}

/// Decides how the client reacts to errors on its socket
///
/// The client never reconnects by itself. Once `closed` fires, the owner
/// has to establish a new client.
pub trait ErrorHandler: Send + Sync {
    /// A frame could not be read, parsed or written
    fn error(&self, error: &ProtocolError) -> ErrorAction;

    /// The server closed the socket
    fn closed(&self);
}

/// Logs every error and keeps going
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrors;

impl ErrorHandler for LogErrors {
    fn error(&self, error: &ProtocolError) -> ErrorAction {
        tracing::warn!("Language server sent an unreadable message: {}", error);
        ErrorAction::Continue
    }

    fn closed(&self) {
        tracing::info!("Language server closed the connection");
    }
}
