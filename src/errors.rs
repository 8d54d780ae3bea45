//! Error types for the availability checker

use std::fmt;

pub type Result<T> = std::result::Result<T, CheckerError>;

#[derive(Debug)]
pub enum CheckerError {
    /// HTTP client could not be built
    Http(reqwest::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// Periodic driver lifecycle misuse
    Scheduler(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for CheckerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckerError::Http(err) => write!(f, "HTTP error: {}", err),
            CheckerError::Io(err) => write!(f, "IO error: {}", err),
            CheckerError::Json(err) => write!(f, "JSON error: {}", err),
            CheckerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CheckerError::Scheduler(msg) => write!(f, "Scheduler error: {}", msg),
            CheckerError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CheckerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckerError::Http(err) => Some(err),
            CheckerError::Io(err) => Some(err),
            CheckerError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CheckerError {
    fn from(err: std::io::Error) -> Self {
        CheckerError::Io(err)
    }
}

impl From<reqwest::Error> for CheckerError {
    fn from(err: reqwest::Error) -> Self {
        CheckerError::Http(err)
    }
}

impl From<serde_json::Error> for CheckerError {
    fn from(err: serde_json::Error) -> Self {
        CheckerError::Json(err)
    }
}
