//! Error types for reviewer-tools.

use thiserror::Error;

/// Main error type for reviewer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// API returned an error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response or input could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// External command (e.g. `gh`) failed
    #[error("Command error: {0}")]
    Command(String),
}

impl Error {
    /// Map an unsuccessful HTTP status to the matching error variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Error::Auth(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }
}

/// Result type alias for reviewer operations.
pub type Result<T> = std::result::Result<T, Error>;
