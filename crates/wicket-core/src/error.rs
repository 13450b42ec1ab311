//! Error types for the wicket session layer.
//!
//! This module provides a unified error type with explicit variants for
//! transport, backend, authentication, decoding, and input validation errors.
//! Every error type is `Clone`: a single refresh failure is delivered to each
//! request that was waiting on it.

use std::fmt;
use thiserror::Error;

/// The unified error type for wicket operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No response was received (DNS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The backend responded with a non-2xx status.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Session-level failures (expired session, not logged in).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A 2xx response body did not have the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Input validation errors (invalid base URL, header value).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true if this is a 401 response from the backend.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api(api) if api.is_unauthorized())
    }

    /// Returns true if the session could not be recovered by a token refresh.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Auth(AuthError::SessionExpired { .. }))
    }

    /// A short message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(api) => api
                .message
                .clone()
                .unwrap_or_else(|| format!("request failed with status {}", api.status)),
            Error::Transport(_) => "unable to reach the server".to_string(),
            Error::Auth(AuthError::SessionExpired { .. }) => {
                "your session has expired, please log in again".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode {
            message: err.to_string(),
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Generic HTTP client error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Session-level errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The access credential expired and could not be refreshed.
    #[error("session expired: {reason}")]
    SessionExpired { reason: String },

    /// The operation requires an authenticated session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// No refresh credential is stored.
    #[error("no refresh token available")]
    MissingRefreshToken,
}

/// A non-2xx response from the backend.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable error code (e.g. `TOKEN_EXPIRED`), if the backend sent one.
    pub code: Option<String>,
    /// Human-readable message from the server.
    pub message: Option<String>,
    /// Raw response body.
    pub body: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create a new API error.
    pub fn new(
        status: u16,
        code: Option<String>,
        message: Option<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            body: body.into(),
        }
    }

    /// Check if this is a credential-expiry response.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Check if the backend reported an expired token.
    pub fn is_token_expired(&self) -> bool {
        self.code.as_deref() == Some("TOKEN_EXPIRED")
    }

    /// Check if the backend reported a malformed or revoked token.
    pub fn is_token_invalid(&self) -> bool {
        self.code.as_deref() == Some("INVALID_TOKEN")
    }
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// A credential contained characters not allowed in an HTTP header.
    #[error("invalid header value for {header}")]
    HeaderValue { header: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
