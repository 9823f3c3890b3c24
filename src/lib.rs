//! # Admin Session
//!
//! Session lifecycle for clients of the storefront admin API: credential
//! exchange, token storage, refresh-on-401, idle-timeout eviction and logout,
//! with the session persisted to device-local storage through
//! [Sea-ORM](https://crates.io/crates/sea-orm).
//!
//! ## Features
//!
//! - A single-owner [`SessionManager`] exposing only the lifecycle operations
//! - Single-flight token refresh: concurrent 401s share one refresh exchange
//! - Requests retried exactly once after a refresh
//! - Idle sessions evicted on startup without touching the network
//! - Versioned, MessagePack-encoded snapshots with forward migration
//! - SQLite (default) or PostgreSQL persistence, or [`MemoryStorage`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use admin_session::{
//!     ApiClient, Credentials, HttpAuthApi, SeaOrmStorage, SessionConfig, SessionManager,
//!     SessionStatus,
//! };
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::from_env()?;
//!
//! let conn = Database::connect("sqlite://admin-session.db?mode=rwc").await?;
//! let storage = SeaOrmStorage::new(conn).with_name(config.storage_key.clone());
//! storage.create_table().await?;
//!
//! let api = HttpAuthApi::new(config.clone())?;
//! let manager = Arc::new(
//!     SessionManager::new(config.clone(), Arc::new(api), Arc::new(storage))
//!         .with_redirect(Arc::new(|| eprintln!("session expired, please sign in"))),
//! );
//!
//! if manager.start().await? != SessionStatus::Authenticated {
//!     manager
//!         .login(&Credentials::new("admin@example.com", "secret123"))
//!         .await?;
//! }
//!
//! let client = ApiClient::new(config, manager.clone())?;
//! let stats: serde_json::Value = client.get("/api/admin/dashboard/stats").await?;
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Activity Tracking
//!
//! UI code reports interaction through [`SessionManager::record_activity`];
//! the timestamp is persisted and checked against
//! [`SessionConfig::idle_timeout`] the next time the session is initialized.

pub mod config;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod manager;
#[cfg(feature = "migration")]
pub mod migration;
pub mod model;
pub mod storage;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use gateway::{ApiClient, AuthApi, HttpAuthApi};
pub use manager::{LoginRedirect, NoRedirect, SessionManager};
pub use model::{
    Admin, Credentials, LoginResponse, ProfileUpdate, RefreshResponse, SessionSnapshot,
    SessionStatus, SessionView,
};
pub use storage::{MemoryStorage, SeaOrmStorage, SessionStorage, SNAPSHOT_VERSION};
