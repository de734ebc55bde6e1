//! Error types for the push messaging client.

use thiserror::Error;

/// Errors that can occur when talking to the messaging API.
#[derive(Debug, Error)]
pub enum FcmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service account key could not be used to sign an assertion.
    #[error("credential error: {0}")]
    Credentials(#[from] jsonwebtoken::errors::Error),

    /// The OAuth2 token exchange was rejected.
    #[error("token exchange failed ({status}): {message}")]
    Auth {
        /// HTTP status returned by the token endpoint.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The messaging API rejected a message.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status returned by the messaging API.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),
}

impl FcmError {
    /// Whether the failure means the token itself is no longer valid.
    #[must_use]
    pub const fn is_unregistered_token(&self) -> bool {
        matches!(self, Self::Api { status: 400 | 404, .. })
    }
}

/// Error body returned by Google APIs.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
