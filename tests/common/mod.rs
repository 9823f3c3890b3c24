#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use admin_session::{
    Admin, AuthApi, Credentials, LoginRedirect, LoginResponse, MemoryStorage, ProfileUpdate,
    RefreshResponse, Result, SessionConfig, SessionError, SessionManager, SessionSnapshot,
};
use async_trait::async_trait;
use time::OffsetDateTime;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn admin() -> Admin {
    Admin {
        id: "1".into(),
        email: "admin@example.com".into(),
        name: "Admin".into(),
        role: "admin".into(),
        active: true,
        created_at: "2024-01-01".into(),
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("admin@example.com", "secret123")
}

pub fn snapshot_active_at(last_activity: OffsetDateTime) -> SessionSnapshot {
    SessionSnapshot {
        admin: Some(admin()),
        access_token: Some("AT1".into()),
        refresh_token: Some("RT1".into()),
        is_authenticated: true,
        last_activity_timestamp: Some(last_activity),
    }
}

pub fn fresh_snapshot() -> SessionSnapshot {
    snapshot_active_at(OffsetDateTime::now_utc() - time::Duration::minutes(1))
}

pub fn stale_snapshot() -> SessionSnapshot {
    snapshot_active_at(OffsetDateTime::now_utc() - time::Duration::minutes(31))
}

/// Scripted [`AuthApi`] that counts calls and records their order.
pub struct MockAuthApi {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub events: Mutex<Vec<&'static str>>,
    login_error: Option<fn() -> SessionError>,
    fail_refresh: bool,
    fail_profile: bool,
    fail_logout: bool,
    delay: Duration,
    logout_delay: Duration,
    valid_token: Mutex<String>,
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self {
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
            login_error: None,
            fail_refresh: false,
            fail_profile: false,
            fail_logout: false,
            delay: Duration::ZERO,
            logout_delay: Duration::ZERO,
            valid_token: Mutex::new("AT1".into()),
        }
    }

    pub fn rejecting_login(mut self, error: fn() -> SessionError) -> Self {
        self.login_error = Some(error);
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    pub fn failing_profile(mut self) -> Self {
        self.fail_profile = true;
        self
    }

    pub fn failing_logout(mut self) -> Self {
        self.fail_logout = true;
        self
    }

    /// Delay applied to every call, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay applied only to the logout call.
    pub fn with_logout_delay(mut self, delay: Duration) -> Self {
        self.logout_delay = delay;
        self
    }

    /// Makes the server reject `AT1` from now on; a refresh yields `AT2`.
    pub fn expire_access_token(&self) {
        *self.valid_token.lock().unwrap() = "AT2".into();
    }

    pub fn accepts(&self, token: &str) -> bool {
        *self.valid_token.lock().unwrap() == token
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if let Some(error) = self.login_error {
            return Err(error());
        }
        assert_eq!(credentials.email, "admin@example.com");
        Ok(LoginResponse {
            admin: admin(),
            access_token: "AT1".into(),
            refresh_token: "RT1".into(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.record("refresh_start");
        self.pause().await;
        self.record("refresh_end");
        if self.fail_refresh {
            return Err(SessionError::Status {
                status: 401,
                message: "refresh token revoked".into(),
            });
        }
        assert_eq!(refresh_token, "RT1");
        Ok(RefreshResponse {
            access_token: self.valid_token.lock().unwrap().clone(),
        })
    }

    async fn profile(&self, access_token: &str) -> Result<Admin> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_profile || !self.accepts(access_token) {
            return Err(SessionError::Unauthorized);
        }
        Ok(admin())
    }

    async fn logout(&self, _refresh_token: &str) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.record("logout");
        self.pause().await;
        if !self.logout_delay.is_zero() {
            tokio::time::sleep(self.logout_delay).await;
        }
        if self.fail_logout {
            return Err(SessionError::NetworkUnreachable("connection refused".into()));
        }
        Ok(())
    }

    async fn update_profile(&self, access_token: &str, update: &ProfileUpdate) -> Result<Admin> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if !self.accepts(access_token) {
            return Err(SessionError::Unauthorized);
        }
        let mut admin = admin();
        if let Some(name) = &update.name {
            admin.name = name.clone();
        }
        Ok(admin)
    }
}

/// Redirect hook that counts its invocations.
#[derive(Default)]
pub struct CountingRedirect(pub AtomicUsize);

impl CountingRedirect {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for CountingRedirect {
    fn redirect_to_login(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub api: Arc<MockAuthApi>,
    pub storage: MemoryStorage,
    pub redirect: Arc<CountingRedirect>,
    pub manager: Arc<SessionManager>,
}

impl Harness {
    pub fn new(api: MockAuthApi) -> Self {
        Self::with_storage(api, MemoryStorage::new())
    }

    pub fn with_storage(api: MockAuthApi, storage: MemoryStorage) -> Self {
        init_tracing();
        let api = Arc::new(api);
        let redirect = Arc::new(CountingRedirect::default());
        let manager = Arc::new(
            SessionManager::new(
                SessionConfig::default(),
                api.clone(),
                Arc::new(storage.clone()),
            )
            .with_redirect(redirect.clone()),
        );
        Self {
            api,
            storage,
            redirect,
            manager,
        }
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// An authenticated session never lacks an access token.
pub fn assert_invariant(manager: &SessionManager) {
    let snapshot = manager.snapshot();
    if snapshot.access_token.is_none() {
        assert!(!snapshot.is_authenticated, "authenticated without a token");
        assert!(!manager.is_authenticated());
    }
}
