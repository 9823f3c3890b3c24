//! Admin session demo
//!
//! Restores a persisted session from SQLite, signs in when the stored session
//! is missing or idle, then fetches the dashboard statistics through the
//! refreshing API client.
//!
//! # Running the demo
//!
//! ```bash
//! export ADMIN_API_BASE_URL=http://localhost:3000
//! export ADMIN_EMAIL=admin@example.com
//! export ADMIN_PASSWORD=secret123
//! cargo run --example admin_session
//! ```
//!
//! `DATABASE_URL` defaults to `sqlite://admin-session.db?mode=rwc`. Running the
//! demo twice within the idle timeout reuses the stored session without a
//! login round-trip.

use std::env;
use std::sync::Arc;

use admin_session::{
    ApiClient, Credentials, HttpAuthApi, SeaOrmStorage, SessionConfig, SessionManager,
    SessionStatus,
};
use dotenvy::dotenv;
use sea_orm::Database;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    dotenv().ok();

    let config = SessionConfig::from_env()?;
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://admin-session.db?mode=rwc".into());

    info!("Opening session storage: {}", database_url);
    let conn = Database::connect(database_url).await?;
    let storage = SeaOrmStorage::new(conn).with_name(config.storage_key.clone());
    storage.create_table().await?;

    let auth = HttpAuthApi::new(config.clone())?;
    let http = auth.client().clone();
    let manager = Arc::new(
        SessionManager::new(config.clone(), Arc::new(auth), Arc::new(storage)).with_redirect(
            Arc::new(|| warn!("Session can no longer be refreshed, sign in again")),
        ),
    );

    if manager.start().await? != SessionStatus::Authenticated {
        let email = env::var("ADMIN_EMAIL")?;
        let password = env::var("ADMIN_PASSWORD")?;

        if let Err(e) = manager.login(&Credentials::new(email, password)).await {
            warn!("Login failed: {}", e.user_message());
            return Err(e.into());
        }
    }

    if let Some(admin) = manager.view().admin {
        info!("Signed in as {} <{}>", admin.name, admin.email);
    }

    let client = ApiClient::with_client(http, config, manager.clone());
    let stats: serde_json::Value = client.get("/api/admin/dashboard/stats").await?;
    info!("Dashboard stats: {}", stats);

    manager.record_activity().await;
    Ok(())
}
