use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("tool server error: {0}")]
    Mcp(#[from] mcp::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
