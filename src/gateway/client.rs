use std::sync::Arc;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::http::build_client;
use super::{error_for_status, json_body};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::manager::SessionManager;

/// Client for the business endpoints (customers, orders, products,
/// discounts, dashboard statistics).
///
/// Payloads are opaque to this crate. Every request carries the manager's
/// current access token; a 401 triggers one refresh and one replay, and a
/// second 401 is returned as [`crate::SessionError::Unauthorized`].
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: SessionConfig,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(config: SessionConfig, session: Arc<SessionManager>) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self {
            client,
            config,
            session,
        })
    }

    /// Reuses an existing client, typically [`HttpAuthApi::client`](crate::HttpAuthApi::client), so auth
    /// and business calls share one connection pool.
    pub fn with_client(client: Client, config: SessionConfig, session: Arc<SessionManager>) -> Self {
        Self {
            client,
            config,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B: Serialize + Sync + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + Sync + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(Method::PUT, path, Some(body)).await
    }

    /// Issues a DELETE, discarding any response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let url = self.config.api_url(path);
        self.session
            .authorized(|token| {
                debug!("DELETE {}", url);
                let request = self.client.delete(&url).bearer_auth(token);
                async move {
                    let response = request.send().await?;
                    if response.status().is_success() {
                        Ok(())
                    } else {
                        Err(error_for_status(response).await)
                    }
                }
            })
            .await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.api_url(path);
        self.session
            .authorized(|token| {
                debug!("{} {}", method, url);
                let mut request = self
                    .client
                    .request(method.clone(), &url)
                    .bearer_auth(token);
                if let Some(body) = body {
                    request = request.json(body);
                }
                async move { json_body(request.send().await?).await }
            })
            .await
    }
}
