//! MCP error types.

use crate::protocol::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to launch server: {0}")]
    Launch(#[source] std::io::Error),

    #[error("failed to write to server: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to read from server: {0}")]
    Read(#[source] std::io::Error),

    #[error("server closed its output")]
    EndOfStream,

    #[error("failed to parse message: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize message: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("remote error: {0}")]
    Remote(#[from] JsonRpcError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("unexpected result: {0}")]
    UnexpectedResult(String),

    #[error("timeout waiting for response")]
    Timeout,

    #[error("line too large: {size} bytes (max {max})")]
    OutputTooLarge { size: usize, max: usize },
}

impl Error {
    /// Whether the session is unusable after this error.
    ///
    /// The client closes its transport when one of these occurs. Errors
    /// raised before a request is written, or after a well-formed response
    /// was read, leave the pipe pair in a known state.
    pub fn is_session_terminal(&self) -> bool {
        !matches!(
            self,
            Error::Remote(_) | Error::Serialize(_) | Error::UnexpectedResult(_)
        )
    }

    /// The remote error code, if the peer reported one.
    pub fn remote_code(&self) -> Option<i32> {
        match self {
            Error::Remote(e) => Some(e.code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a tool registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool already registered: {0}")]
    Duplicate(String),
}

/// Error a tool handler reports for one invocation.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_keep_the_session() {
        let remote = Error::Remote(JsonRpcError::method_not_found());
        assert!(!remote.is_session_terminal());
        assert_eq!(remote.remote_code(), Some(-32601));
        assert!(Error::EndOfStream.is_session_terminal());
        assert!(Error::Timeout.is_session_terminal());
        assert!(!Error::UnexpectedResult("tools".into()).is_session_terminal());
        assert_eq!(Error::EndOfStream.remote_code(), None);
    }
}
