//! Crate error types

use std::fmt;

/// Error type for module synchronization operations
#[derive(Debug)]
pub enum Error {
    /// I/O failure on the control channel or a client connection
    Io(std::io::Error),
    /// Outbound message could not be serialized
    Serialize(serde_json::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serialize(e) => write!(f, "Failed to serialize message: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Serialize(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialize(e)
    }
}
