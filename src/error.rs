//! Error types for abm-verify
//!
//! This module defines the error taxonomy for the client-assertion flow,
//! using `thiserror` for ergonomic error handling. Every variant is fatal:
//! the flow is a linear, fail-fast sequence with no retries.

use thiserror::Error;

/// Main error type for abm-verify operations
///
/// Each stage of the flow maps to one variant, so callers can tell a
/// configuration mistake from a rejected assertion without parsing
/// messages.
#[derive(Error, Debug)]
pub enum AbmError {
    /// Missing or invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Private key could not be read or is not an unencrypted PKCS#8 P-256 key
    #[error("Key load error: {0}")]
    KeyLoad(String),

    /// Signing or JWT serialization failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Token endpoint answered with a non-2xx status
    #[error("Token exchange failed with status {status}: {body}")]
    TokenExchange {
        /// HTTP status code returned by the token endpoint
        status: u16,
        /// Raw response body, unmodified
        body: String,
    },

    /// Token endpoint answered 2xx but the body is unusable
    #[error("Token response error: {0}")]
    TokenResponse(String),

    /// A network call exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A compact JWT failed decoding or signature verification
    #[error("Invalid assertion: {0}")]
    InvalidAssertion(String),

    /// HTTP transport errors other than timeouts
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for abm-verify library operations
pub type Result<T> = std::result::Result<T, AbmError>;

impl AbmError {
    /// Classifies a `reqwest` error, separating timeouts from other transport
    /// failures.
    ///
    /// # Arguments
    ///
    /// * `err` - The error returned by `send()` or a body read
    /// * `context` - What was being attempted, used in the timeout message
    pub fn from_transport(err: reqwest::Error, context: &str) -> Self {
        if err.is_timeout() {
            AbmError::Timeout(format!("{context}: {err}"))
        } else {
            AbmError::Http(err)
        }
    }
}
