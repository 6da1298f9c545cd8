//! Error types for Boardnotes
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Boardnotes operations
///
/// The first five variants are user-facing: the HTTP layer maps each of them
/// to a status code and shows the message as-is. The remaining variants are
/// infrastructure failures and surface as internal errors.
#[derive(Error, Debug)]
pub enum BoardnotesError {
    /// Bad input: missing fields, image count out of range, weak password
    #[error("{0}")]
    Validation(String),

    /// The email address is already registered
    #[error("{0}")]
    Conflict(String),

    /// Login failed, without saying which field was wrong
    #[error("Invalid email or password")]
    Authentication,

    /// A generation was attempted before the session cooldown elapsed
    #[error("Please wait {retry_after_ms} ms before generating again")]
    RateLimited {
        /// Milliseconds until the next attempt is allowed
        retry_after_ms: u64,
    },

    /// The model call failed (timeout, provider error, empty response)
    #[error("Note generation failed, please try again")]
    Generation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, bad responses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider rejected the credential (401 Unauthorized)
    #[error("Provider authentication error: {0}")]
    ProviderAuthentication(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Database operations
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record missing or not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

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
}

impl BoardnotesError {
    /// Whether the message is safe to show to an end user verbatim
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Conflict(_)
                | Self::Authentication
                | Self::RateLimited { .. }
                | Self::Generation(_)
                | Self::NotFound(_)
        )
    }
}

/// Result type alias for Boardnotes operations
///
/// Uses `anyhow::Error` so callers can attach context; the HTTP boundary
/// downcasts back to [`BoardnotesError`] to choose a status code.
pub type Result<T> = anyhow::Result<T>;
