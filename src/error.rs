//! Encore error types

use thiserror::Error;

/// Encore error type
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// A chat message that trims to nothing
    #[error("Message is empty")]
    EmptyInput,

    /// A request is already in flight on this session
    #[error("Session is busy waiting for a response")]
    Busy,

    /// Network-level failure reaching a provider or remote tier
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response from a model backend
    #[error("Provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    /// 2xx response without usable reply text
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// Credential or project-level restriction; switch provider or rotate the key
    #[error("Account restricted: {0}")]
    AccountRestricted(String),

    /// Configuration error (e.g. missing credential)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown entity
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation reserved for administrators
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Local tier failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Transport(format!("request timed out: {err}"))
        } else {
            Error::Transport(err.to_string())
        }
    }
}

/// Result type alias for Encore operations
pub type Result<T> = std::result::Result<T, Error>;
