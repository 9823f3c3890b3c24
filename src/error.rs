//! Error types for session operations.
//!
//! Login failures are recoverable and carry a display message through
//! [`SessionError::user_message`]. Refresh failures are never recovered
//! locally: by the time a [`SessionError::RefreshFailed`] reaches a caller the
//! session has already been cleared and a login redirect emitted.

use thiserror::Error;

use crate::model::SessionStatus;

/// Errors produced by the session manager, the HTTP gateway and the storage
/// backends.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The login endpoint rejected the email/password pair (HTTP 401).
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account exists but has been deactivated (HTTP 403 at login).
    #[error("account is disabled")]
    AccountDisabled,

    /// Too many login attempts (HTTP 429 at login).
    #[error("too many login attempts")]
    RateLimited,

    /// The identity record could not be fetched with the stored token.
    #[error("failed to fetch admin profile: {0}")]
    ProfileFetchFailed(String),

    /// The refresh token could not be exchanged for a new access token.
    #[error("failed to refresh access token: {0}")]
    RefreshFailed(String),

    /// No response was received at all.
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    /// A request was rejected with 401 even after a token refresh.
    #[error("request unauthorized")]
    Unauthorized,

    /// The operation needs an access token and none is held.
    #[error("no active session")]
    NotAuthenticated,

    /// A conflicting transition is already in flight.
    #[error("session is busy ({0})")]
    Busy(SessionStatus),

    /// Any other non-success HTTP response.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Serializing a snapshot or request body failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// A stored snapshot or response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Message suitable for an inline login-form notice.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidCredentials => "Invalid email or password.".to_string(),
            SessionError::AccountDisabled => {
                "This account has been disabled. Contact an administrator.".to_string()
            }
            SessionError::RateLimited => {
                "Too many login attempts. Please wait and try again.".to_string()
            }
            SessionError::NetworkUnreachable(_) => {
                "The server could not be reached. Check your connection.".to_string()
            }
            SessionError::Busy(_) => "Another sign-in operation is in progress.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::NetworkUnreachable(_))
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SessionError::Decode(e.to_string())
        } else if e.is_builder() {
            SessionError::Config(e.to_string())
        } else if let Some(status) = e.status() {
            SessionError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            SessionError::NetworkUnreachable(e.to_string())
        }
    }
}

impl From<sea_orm::DbErr> for SessionError {
    fn from(e: sea_orm::DbErr) -> Self {
        SessionError::Storage(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for SessionError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        SessionError::Encode(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for SessionError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        SessionError::Decode(e.to_string())
    }
}
