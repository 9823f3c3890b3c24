//! Session data types.
//!
//! Wire types use the API's camelCase field names. [`SessionSnapshot`] is the
//! persisted subset of the session; everything else about the lifecycle lives
//! only in memory.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identity record of the signed-in administrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub active: bool,
    pub created_at: String,
}

/// Email/password pair submitted to the login endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub admin: Admin,
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful refresh payload. The refresh token itself is not rotated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Partial profile update; absent fields are left untouched server-side.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Lifecycle position of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Initializing,
    Authenticated,
    Unauthenticated,
    LoggingIn,
    LoggingOut,
    Refreshing,
}

impl SessionStatus {
    /// Whether a network-backed transition is currently in flight.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            SessionStatus::Initializing
                | SessionStatus::LoggingIn
                | SessionStatus::LoggingOut
                | SessionStatus::Refreshing
        )
    }

    pub fn is_logging_in(self) -> bool {
        self == SessionStatus::LoggingIn
    }

    pub fn is_logging_out(self) -> bool {
        self == SessionStatus::LoggingOut
    }

    pub fn is_refreshing(self) -> bool {
        self == SessionStatus::Refreshing
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Uninitialized => "uninitialized",
            SessionStatus::Initializing => "initializing",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::LoggingIn => "logging_in",
            SessionStatus::LoggingOut => "logging_out",
            SessionStatus::Refreshing => "refreshing",
        };
        f.write_str(s)
    }
}

/// The persisted subset of a session.
///
/// Missing keys decode to their defaults, which is what lets records written
/// by older schema versions load without losing the values they do carry.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSnapshot {
    pub admin: Option<Admin>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_authenticated: bool,
    pub last_activity_timestamp: Option<OffsetDateTime>,
}

impl SessionSnapshot {
    /// True when nothing about a previous session is retained.
    pub fn is_empty(&self) -> bool {
        self.admin.is_none()
            && self.access_token.is_none()
            && self.refresh_token.is_none()
            && !self.is_authenticated
    }
}

impl fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("admin", &self.admin)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("is_authenticated", &self.is_authenticated)
            .field("last_activity_timestamp", &self.last_activity_timestamp)
            .finish()
    }
}

/// Read-only view of the session handed to UI collaborators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionView {
    pub admin: Option<Admin>,
    pub is_authenticated: bool,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub last_activity_timestamp: Option<OffsetDateTime>,
}
