//! Error types for respd
//!
//! Provides a unified error type for server operations and a separate
//! error type for failures raised while dispatching a single command.

use thiserror::Error;

/// Result type alias using RespdError
pub type Result<T> = std::result::Result<T, RespdError>;

/// Unified error type for respd operations
#[derive(Debug, Error)]
pub enum RespdError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Dispatch Errors
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Acceptor thread panicked")]
    ThreadPanic,
}

impl RespdError {
    /// True when the error means the peer went away rather than misbehaved
    pub fn is_disconnect(&self) -> bool {
        use std::io::ErrorKind;

        match self {
            RespdError::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::WouldBlock
                    | ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// Failure raised by a command while handling one request.
///
/// Always rendered to the client as a single-line error reply; never ends
/// the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{command}' command (expected {expected}, got {got})")]
    WrongArity {
        command: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid argument #{position}: {reason}")]
    InvalidArgument { position: usize, reason: String },

    #[error("{0}")]
    Failed(String),
}

impl DispatchError {
    /// Application-level failure with a free-form message
    pub fn failed(message: impl Into<String>) -> Self {
        DispatchError::Failed(message.into())
    }
}

impl From<String> for DispatchError {
    fn from(message: String) -> Self {
        DispatchError::Failed(message)
    }
}

impl From<&str> for DispatchError {
    fn from(message: &str) -> Self {
        DispatchError::Failed(message.to_string())
    }
}
