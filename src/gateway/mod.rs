//! HTTP gateway to the admin API.
//!
//! [`AuthApi`] is the wire contract the session manager depends on;
//! [`HttpAuthApi`] implements it over `reqwest`. [`ApiClient`] carries every
//! other request, attaching the current bearer token and routing 401s through
//! the manager's refresh path.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{Result, SessionError};
use crate::model::{Admin, Credentials, LoginResponse, ProfileUpdate, RefreshResponse};

mod client;
mod http;

pub use client::ApiClient;
pub use http::HttpAuthApi;

/// Authentication endpoints of the admin API.
///
/// Implementations report a 401 on bearer-authenticated calls as
/// [`SessionError::Unauthorized`] so the manager can refresh and retry.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchanges credentials for an identity and a token pair.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse>;

    /// Fetches the identity bound to an access token.
    async fn profile(&self, access_token: &str) -> Result<Admin>;

    /// Invalidates a refresh token server-side.
    async fn logout(&self, refresh_token: &str) -> Result<()>;

    /// Updates name, email or password of the signed-in admin.
    async fn update_profile(&self, access_token: &str, update: &ProfileUpdate) -> Result<Admin>;
}

/// Maps a non-success status to an error, reading the body for context.
pub(crate) async fn error_for_status(response: Response) -> SessionError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return SessionError::Unauthorized;
    }
    let message = response.text().await.unwrap_or_default();
    SessionError::Status {
        status: status.as_u16(),
        message: extract_message(&message),
    }
}

/// Decodes a JSON body from a successful response.
pub(crate) async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_for_status(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| SessionError::Decode(e.to_string()))
}

// The API reports errors as `{"message": "..."}`; fall back to the raw body.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_field() {
        assert_eq!(extract_message(r#"{"message":"Not found"}"#), "Not found");
        assert_eq!(extract_message("Bad Gateway"), "Bad Gateway");
    }
}
