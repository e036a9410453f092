//! Error types for Studyflow
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Studyflow operations
///
/// Covers configuration loading, REST collaborator failures, credential
/// storage, the chat event channel, and chat session state violations.
#[derive(Error, Debug)]
pub enum StudyflowError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Login or registration was rejected (bad credentials, duplicate email)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// An authenticated call was rejected with 401; the stored token is no
    /// longer valid and the user must log in again
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// No credential is available for a call that requires one
    #[error("Not logged in")]
    NotAuthenticated,

    /// The backend (or a local role check) refused the operation
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success API response
    #[error("API error ({status}): {detail}")]
    Api {
        /// HTTP status code returned by the backend
        status: u16,
        /// `detail` field of the error body, or the raw body
        detail: String,
    },

    /// The chat view could not be loaded (session resolution or history)
    #[error("Failed to load chat: {0}")]
    ChatLoad(String),

    /// Channel membership state machine violation
    #[error("Membership error: {0}")]
    Membership(String),

    /// Event channel transport failures (connect, send, closed)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed Engine.IO / Socket.IO frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl StudyflowError {
    /// Returns `true` for failures that require a fresh login.
    ///
    /// Used by the auth layer to decide between a forced logout and a
    /// non-blocking notification.
    ///
    /// # Examples
    ///
    /// ```
    /// use studyflow::error::StudyflowError;
    ///
    /// assert!(StudyflowError::SessionExpired("401".into()).requires_login());
    /// assert!(StudyflowError::NotAuthenticated.requires_login());
    /// assert!(!StudyflowError::NotFound("task".into()).requires_login());
    /// ```
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired(_) | Self::NotAuthenticated)
    }
}

/// Result type alias for Studyflow operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Returns the [`StudyflowError`] carried by an `anyhow::Error`, if any.
pub fn classify(err: &anyhow::Error) -> Option<&StudyflowError> {
    err.downcast_ref::<StudyflowError>()
}
