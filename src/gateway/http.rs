use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use super::{error_for_status, json_body, AuthApi};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::model::{Admin, Credentials, LoginResponse, ProfileUpdate, RefreshResponse};

/// [`AuthApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Client,
    config: SessionConfig,
}

impl HttpAuthApi {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let client = build_client(&config)?;
        info!(base_url = %config.api_base_url, "created admin auth client");
        Ok(Self { client, config })
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

pub(crate) fn build_client(config: &SessionConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| SessionError::Config(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let url = self.config.auth_url("login");
        debug!(email = %credentials.email, "POST {}", url);

        let response = self.client.post(&url).json(credentials).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(SessionError::InvalidCredentials),
            StatusCode::FORBIDDEN => Err(SessionError::AccountDisabled),
            StatusCode::TOO_MANY_REQUESTS => Err(SessionError::RateLimited),
            _ => json_body(response).await,
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let url = self.config.auth_url("refresh");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        json_body(response).await
    }

    async fn profile(&self, access_token: &str) -> Result<Admin> {
        let url = self.config.auth_url("me");
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;
        json_body(response).await
    }

    async fn logout(&self, refresh_token: &str) -> Result<()> {
        let url = self.config.auth_url("logout");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_for_status(response).await)
        }
    }

    async fn update_profile(&self, access_token: &str, update: &ProfileUpdate) -> Result<Admin> {
        let url = self.config.auth_url("update-profile");
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .bearer_auth(access_token)
            .json(update)
            .send()
            .await?;
        json_body(response).await
    }
}
