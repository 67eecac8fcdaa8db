//! HeritageBot error types

use thiserror::Error;

/// HeritageBot error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Payload failed structural validation
    #[error("Parse error: {0}")]
    Parse(String),

    /// File name or extension does not match the expected data format
    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the payload itself was unusable
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

/// Result type alias for HeritageBot operations
pub type Result<T> = std::result::Result<T, Error>;
