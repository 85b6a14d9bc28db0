//! Error types for remote applications
//!
//! Messages are phrased for whoever reads a failed keyword in a suite report,
//! with a hint on which keyword to use when the fix is a usage one.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for remote applications
#[derive(Error, Debug)]
pub enum Error {
    // === Transient connectivity ===
    #[error("Service at '{url}' is not available: {reason}")]
    ServiceUnavailable { url: String, reason: String },

    #[error("Connection to remote service lost: {0}")]
    Transport(String),

    #[error("Invalid endpoint URL '{0}'")]
    InvalidUrl(String),

    // === Fatal connectivity ===
    #[error("Could not connect to application {0}")]
    CouldNotConnect(String),

    // === Usage errors ===
    #[error("Application already connected")]
    AlreadyConnected,

    #[error("No connection established. Use keyword 'Application Started' before this keyword.")]
    NotConnected,

    #[error("Application with alias '{0}' already in use")]
    AliasInUse(String),

    #[error("No Application with alias '{0}' in use")]
    UnknownAlias(String),

    #[error("No application selected")]
    NoActiveApplication,

    #[error("Keyword '{keyword}' got invalid arguments: {message}")]
    InvalidArguments { keyword: String, message: String },

    #[error("Invalid rendezvous record: {0}")]
    InvalidRecord(String),

    #[error("Invalid timeout '{0}'")]
    InvalidTimeout(String),

    // === Close / dispatch ===
    #[error("Could not close application.")]
    CloseFailed,

    #[error("No keyword with name '{0}' found")]
    UnknownKeyword(String),

    // === Server side ===
    #[error("Library '{0}' not found")]
    LibraryNotFound(String),

    #[error("Service '{service}' has no method '{method}'")]
    NoSuchMethod { service: String, method: String },

    #[error("Service closed")]
    ServiceClosed,

    #[error("{message}")]
    Remote { code: String, message: String },

    // === Launching ===
    #[error("Failed to launch application: {0}")]
    LaunchFailed(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a service unavailable error for an endpoint
    pub fn unavailable(url: impl ToString, reason: impl ToString) -> Self {
        Self::ServiceUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid arguments error for a keyword
    pub fn invalid_arguments(keyword: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            keyword: keyword.to_string(),
            message: message.into(),
        }
    }

    /// Error raised when an application cannot be reached, alias may be unset
    pub fn could_not_connect(alias: Option<&str>) -> Self {
        Self::CouldNotConnect(alias.unwrap_or_default().to_string())
    }

    /// Transport-level failure: the remote side is unreachable or went away
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. } | Self::Transport(_))
    }

    /// Failure the connection negotiator retries until its deadline
    pub fn is_transient(&self) -> bool {
        self.is_connectivity() || matches!(self, Self::InvalidUrl(_))
    }
}

/// Wire-serializable error carried in RPC responses
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

impl From<&Error> for RemoteError {
    fn from(e: &Error) -> Self {
        let code = match e {
            Error::LibraryNotFound(_) => "LIBRARY_NOT_FOUND",
            Error::NoSuchMethod { .. } => "NO_SUCH_METHOD",
            Error::UnknownKeyword(_) => "UNKNOWN_KEYWORD",
            Error::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            Error::Remote { code, .. } => code.as_str(),
            _ => "KEYWORD_FAILED",
        }
        .to_string();

        let message = match e {
            Error::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        };

        Self { code, message }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        // Remote failures never map back to connectivity kinds, so a failing
        // keyword is not mistaken for a dropped connection.
        Error::Remote {
            code: e.code,
            message: e.message,
        }
    }
}
