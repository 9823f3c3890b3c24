use std::env;
use std::time::Duration;

use crate::error::{Result, SessionError};

/// Default idle period after which a restored session is evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default per-request timeout of the HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum gap between two persisted activity stamps.
pub const DEFAULT_ACTIVITY_PERSIST_INTERVAL: Duration = Duration::from_secs(5);

/// Default name of the persisted session record.
pub const DEFAULT_STORAGE_KEY: &str = "auth-storage";

/// Default path prefix of the authentication endpoints.
pub const DEFAULT_AUTH_PREFIX: &str = "/api/admin/auth";

/// Runtime configuration for the session manager and its HTTP gateway.
///
/// ```
/// use std::time::Duration;
/// use admin_session::SessionConfig;
///
/// let config = SessionConfig::new("https://api.example.com")
///     .with_idle_timeout(Duration::from_secs(15 * 60))
///     .with_storage_key("staging-auth");
/// assert_eq!(config.auth_url("login"), "https://api.example.com/api/admin/auth/login");
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the admin API, without a trailing slash.
    pub api_base_url: String,
    /// Path prefix of the authentication endpoints.
    pub auth_prefix: String,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Maximum gap since the last recorded activity before eviction.
    pub idle_timeout: Duration,
    /// Activity signals closer than this to the last persisted stamp only
    /// update memory.
    pub activity_persist_interval: Duration,
    /// Name of the persisted session record.
    pub storage_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

impl SessionConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            activity_persist_interval: DEFAULT_ACTIVITY_PERSIST_INTERVAL,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Reads overrides from the process environment.
    ///
    /// Recognized variables: `ADMIN_API_BASE_URL`, `ADMIN_API_TIMEOUT_SECS`,
    /// `ADMIN_IDLE_TIMEOUT_MINS` and `ADMIN_SESSION_STORAGE_KEY`. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var("ADMIN_API_BASE_URL") {
            Ok(url) => Self::new(url),
            Err(_) => Self::default(),
        };

        if let Some(secs) = parse_env_u64("ADMIN_API_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(mins) = parse_env_u64("ADMIN_IDLE_TIMEOUT_MINS")? {
            config.idle_timeout = Duration::from_secs(mins * 60);
        }
        if let Ok(key) = env::var("ADMIN_SESSION_STORAGE_KEY") {
            config.storage_key = key;
        }

        Ok(config)
    }

    pub fn with_auth_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.auth_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_activity_persist_interval(mut self, interval: Duration) -> Self {
        self.activity_persist_interval = interval;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Absolute URL of an authentication endpoint.
    pub fn auth_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}/{}",
            self.api_base_url,
            self.auth_prefix,
            endpoint.trim_start_matches('/')
        )
    }

    /// Absolute URL of an arbitrary API path.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

fn parse_env_u64(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| SessionError::Config(format!("{name}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}
