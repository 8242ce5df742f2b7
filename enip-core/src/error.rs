use crate::status::EncapStatus;
use thiserror::Error;

/// Main error type for the EtherNet/IP stack
#[derive(Error, Debug)]
pub enum EipError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Truncated data: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stale handle: {0}")]
    StaleHandle(String),

    #[error("Encapsulation status {0:?}")]
    Encapsulation(EncapStatus),

    #[error("Timeout")]
    Timeout,
}

/// Result type alias for EtherNet/IP operations
pub type EipResult<T> = Result<T, EipError>;
