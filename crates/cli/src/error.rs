//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Tool input given on the command line is not a JSON object.
    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    /// The built-in tool set could not be assembled.
    #[error(transparent)]
    Registry(#[from] mcp::RegistryError),

    /// An error occurred talking to or serving the protocol.
    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
