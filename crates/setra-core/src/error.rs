//! Core error types for setra-core.
//!
//! One enum per collaborator, folded into [`CoreError`] with `#[from]` so
//! callers can use `?` across module boundaries.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for setra-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session/identity errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Backend REST errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Route guard refusals
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable key-value storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store could not be read
    #[error("Failed to read storage at {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    /// The backing store could not be written
    #[error("Failed to write storage at {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    /// Storage is not available at all (no data dir, poisoned lock)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Session and token errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Token is not three dot-separated segments or the payload is not JSON
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Token `exp` claim is in the past
    #[error("Token expired at {0}")]
    TokenExpired(chrono::DateTime<chrono::Utc>),

    /// Backend rejected the credentials
    #[error("E-mail ou senha inválidos.")]
    InvalidCredentials,

    /// Backend rejected the stored token
    #[error("Token inválido.")]
    InvalidToken,

    /// Any other backend failure while signing in
    #[error("Ocorreu um erro ao tentar fazer login.")]
    LoginFailed(#[source] ApiError),

    /// Operation needs an authenticated user
    #[error("Not authenticated")]
    NotAuthenticated,
}

/// Backend REST errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Base URL or endpoint could not be joined
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body was expected but missing
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// Response body did not match the expected shape
    #[error("Unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// HTTP status if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Route guard refusals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Session lacks the roles `path` requires
    #[error("access to {path} denied; redirected to {redirect_to}")]
    Denied { path: String, redirect_to: String },

    /// Identity has not resolved yet
    #[error("session still loading; cannot open {0}")]
    Pending(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Required field missing or blank
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
