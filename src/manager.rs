//! The session manager.
//!
//! [`SessionManager`] is the single owner of session state. Token and identity
//! fields change only through its operations; UI collaborators read a
//! [`SessionView`] or follow status transitions through [`SessionManager::subscribe`].
//!
//! State sits behind a synchronous mutex that is never held across an
//! `.await`, so each transition that follows a network call is applied in one
//! critical section. Refresh and logout additionally serialize on an async
//! lock: a caller that waited on it while another refresh was in flight finds
//! the access token already replaced and replays with the new one.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::gateway::AuthApi;
use crate::model::{Admin, Credentials, ProfileUpdate, SessionSnapshot, SessionStatus, SessionView};
use crate::storage::SessionStorage;

/// Navigation side effect emitted when the credential chain is unrecoverable.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

impl<F> LoginRedirect for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self()
    }
}

/// Redirect hook for headless clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRedirect;

impl LoginRedirect for NoRedirect {
    fn redirect_to_login(&self) {}
}

#[derive(Default)]
struct SessionState {
    admin: Option<Admin>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    is_authenticated: bool,
    last_activity: Option<OffsetDateTime>,
    /// Activity stamp held by the last successful write to storage.
    persisted_activity: Option<OffsetDateTime>,
    status: SessionStatus,
    error: Option<String>,
}

impl SessionState {
    fn clear(&mut self) {
        self.admin = None;
        self.access_token = None;
        self.refresh_token = None;
        self.is_authenticated = false;
        self.last_activity = None;
    }

    fn apply(&mut self, snapshot: SessionSnapshot) {
        self.admin = snapshot.admin;
        self.access_token = snapshot.access_token;
        self.refresh_token = snapshot.refresh_token;
        self.is_authenticated = snapshot.is_authenticated && self.access_token.is_some();
        self.last_activity = snapshot.last_activity_timestamp;
        self.persisted_activity = snapshot.last_activity_timestamp;
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            admin: self.admin.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            is_authenticated: self.is_authenticated,
            last_activity_timestamp: self.last_activity,
        }
    }

    /// Status to settle on once a transient operation completes.
    fn settled_status(&self) -> SessionStatus {
        if self.is_authenticated {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }
}

/// Owner of the authentication lifecycle.
pub struct SessionManager {
    config: SessionConfig,
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn SessionStorage>,
    redirect: Arc<dyn LoginRedirect>,
    state: Mutex<SessionState>,
    refresh_lock: tokio::sync::Mutex<()>,
    persist_lock: tokio::sync::Mutex<()>,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        api: Arc<dyn AuthApi>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Uninitialized);
        Self {
            config,
            api,
            storage,
            redirect: Arc::new(NoRedirect),
            state: Mutex::new(SessionState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            persist_lock: tokio::sync::Mutex::new(()),
            status_tx,
        }
    }

    /// Sets the hook invoked when a refresh fails and the user must sign in
    /// again.
    pub fn with_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = redirect;
        self
    }

    /// Hydrates from storage and runs [`Self::initialize_session`].
    pub async fn start(&self) -> Result<SessionStatus> {
        self.hydrate().await?;
        Ok(self.initialize_session().await)
    }

    /// Loads the persisted snapshot into memory.
    ///
    /// An undecodable record is discarded and the session starts empty;
    /// backend failures are returned.
    pub async fn hydrate(&self) -> Result<()> {
        let snapshot = match self.storage.load().await {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(SessionError::Decode(e)) => {
                warn!(error = %e, "discarding unreadable session snapshot");
                SessionSnapshot::default()
            }
            Err(e) => return Err(e),
        };

        debug!(restored = !snapshot.is_empty(), "hydrated session");
        self.lock_state().apply(snapshot);
        Ok(())
    }

    /// Resolves the hydrated session to authenticated or unauthenticated.
    ///
    /// A session idle for longer than the configured timeout is evicted
    /// without any network call. A token without a confirmed identity costs
    /// one profile fetch; a token with a cached identity is accepted as is.
    /// Calling this again on an authenticated, non-idle session changes
    /// nothing.
    pub async fn initialize_session(&self) -> SessionStatus {
        let now = OffsetDateTime::now_utc();

        let access_token = {
            let mut state = self.lock_state();
            if state.status.is_transient() {
                return state.status;
            }

            let idle = self.is_idle(&state, now);
            if state.status == SessionStatus::Authenticated && !idle {
                return state.status;
            }

            if idle {
                info!("session idle past timeout, evicting");
                state.clear();
                self.set_status(&mut state, SessionStatus::Unauthenticated);
                None
            } else {
                match state.access_token.clone() {
                    Some(token) if !state.is_authenticated || state.admin.is_none() => {
                        self.set_status(&mut state, SessionStatus::Initializing);
                        Some(token)
                    }
                    Some(_) => {
                        state.is_authenticated = true;
                        self.set_status(&mut state, SessionStatus::Authenticated);
                        None
                    }
                    None => {
                        state.is_authenticated = false;
                        self.set_status(&mut state, SessionStatus::Unauthenticated);
                        None
                    }
                }
            }
        };

        if let Some(token) = access_token {
            let result = self.api.profile(&token).await;

            let mut state = self.lock_state();
            // A logout may have cleared the session while the fetch was pending.
            if state.access_token.as_deref() == Some(token.as_str()) {
                match result {
                    Ok(admin) => {
                        info!(admin_id = %admin.id, "session restored");
                        state.admin = Some(admin);
                        state.is_authenticated = true;
                        state.last_activity = Some(OffsetDateTime::now_utc());
                    }
                    Err(e) => {
                        let e = SessionError::ProfileFetchFailed(e.to_string());
                        warn!(error = %e, "dropping stored session");
                        state.clear();
                    }
                }
            }
            if state.status == SessionStatus::Initializing {
                let settled = state.settled_status();
                self.set_status(&mut state, settled);
            }
        }

        self.persist().await;
        self.status()
    }

    /// Signs in with email and password.
    ///
    /// On failure the session keeps whatever it held before the attempt and
    /// the error's display message is recorded in [`SessionView::error`].
    pub async fn login(&self, credentials: &Credentials) -> Result<Admin> {
        {
            let mut state = self.lock_state();
            if state.status.is_transient() {
                return Err(SessionError::Busy(state.status));
            }
            state.error = None;
            self.set_status(&mut state, SessionStatus::LoggingIn);
        }

        let result = self.api.login(credentials).await;

        let outcome = {
            let mut state = self.lock_state();
            let outcome = match result {
                Ok(response) => {
                    info!(admin_id = %response.admin.id, "logged in");
                    state.admin = Some(response.admin.clone());
                    state.access_token = Some(response.access_token);
                    state.refresh_token = Some(response.refresh_token);
                    state.is_authenticated = true;
                    state.error = None;
                    state.last_activity = Some(OffsetDateTime::now_utc());
                    Ok(response.admin)
                }
                Err(e) => {
                    warn!(error = %e, "login failed");
                    state.error = Some(e.user_message());
                    Err(e)
                }
            };
            let settled = state.settled_status();
            self.set_status(&mut state, settled);
            outcome
        };

        if outcome.is_ok() {
            self.persist().await;
        }
        outcome
    }

    /// Signs out.
    ///
    /// The server is asked to invalidate the refresh token, but local state is
    /// cleared whatever the outcome of that call. Waits for an in-flight
    /// refresh to settle first.
    pub async fn logout(&self) -> Result<()> {
        let _refresh = self.refresh_lock.lock().await;

        let refresh_token = {
            let mut state = self.lock_state();
            if matches!(
                state.status,
                SessionStatus::LoggingIn | SessionStatus::LoggingOut
            ) {
                return Err(SessionError::Busy(state.status));
            }
            self.set_status(&mut state, SessionStatus::LoggingOut);
            state.refresh_token.clone()
        };

        // Clears local state even if this future is dropped mid-request.
        let guard = ClearOnDrop(self);

        if let Some(token) = refresh_token {
            if let Err(e) = self.api.logout(&token).await {
                warn!(error = %e, "server-side logout failed, clearing local session anyway");
            }
        }

        drop(guard);
        info!("logged out");
        self.persist().await;
        Ok(())
    }

    /// Stamps the last activity time. Never moves it backwards.
    ///
    /// The stamp is written to storage only once it is at least
    /// [`SessionConfig::activity_persist_interval`] ahead of the stored one.
    pub async fn record_activity(&self) {
        let due = {
            let mut state = self.lock_state();
            let now = OffsetDateTime::now_utc();
            let stamp = match state.last_activity {
                Some(previous) if previous > now => previous,
                _ => now,
            };
            state.last_activity = Some(stamp);
            match state.persisted_activity {
                Some(persisted) => (stamp - persisted) >= self.config.activity_persist_interval,
                None => true,
            }
        };
        if due {
            self.persist().await;
        }
    }

    /// Runs a bearer-authenticated operation, refreshing and replaying once if
    /// it fails with [`SessionError::Unauthorized`].
    ///
    /// This is the gateway's 401 path; [`crate::ApiClient`] routes every
    /// request through it. A second 401 is returned to the caller.
    pub async fn authorized<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.access_token().ok_or(SessionError::NotAuthenticated)?;

        match op(token.clone()).await {
            Err(SessionError::Unauthorized) => {
                debug!("request rejected with 401, refreshing access token");
                let fresh = self.refresh_access_token(&token).await?;
                op(fresh).await
            }
            other => other,
        }
    }

    /// Updates the signed-in admin's profile and records the returned
    /// identity.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Admin> {
        let api = Arc::clone(&self.api);
        let admin = self
            .authorized(|token| {
                let api = Arc::clone(&api);
                async move { api.update_profile(&token, update).await }
            })
            .await?;

        self.lock_state().admin = Some(admin.clone());
        self.persist().await;
        Ok(admin)
    }

    /// Exchanges the refresh token for a new access token after
    /// `rejected_token` drew a 401.
    ///
    /// Only one exchange runs at a time. A caller that queued behind a
    /// successful exchange gets the new token without a second round-trip;
    /// one that queued behind a failed exchange gets an error without a
    /// second redirect.
    pub(crate) async fn refresh_access_token(&self, rejected_token: &str) -> Result<String> {
        let _refresh = self.refresh_lock.lock().await;

        let (refresh_token, previous) = {
            let mut state = self.lock_state();
            match state.access_token.as_deref() {
                None => {
                    return Err(SessionError::RefreshFailed(
                        "session ended while waiting for refresh".to_string(),
                    ))
                }
                Some(current) if current != rejected_token => {
                    debug!("access token already refreshed, replaying");
                    return Ok(current.to_string());
                }
                Some(_) => {}
            }
            match state.status {
                SessionStatus::LoggingOut => return Err(SessionError::NotAuthenticated),
                // The login in flight replaces both tokens; refreshing now would
                // pair a new access token with a stale refresh token.
                SessionStatus::LoggingIn => return Err(SessionError::Busy(state.status)),
                _ => {}
            }

            let previous = state.status;
            match state.refresh_token.clone() {
                Some(token) => {
                    self.set_status(&mut state, SessionStatus::Refreshing);
                    (Some(token), previous)
                }
                None => {
                    state.clear();
                    self.set_status(&mut state, SessionStatus::Unauthenticated);
                    (None, previous)
                }
            }
        };

        let Some(refresh_token) = refresh_token else {
            warn!("401 without a refresh token, ending session");
            self.persist().await;
            self.redirect.redirect_to_login();
            return Err(SessionError::RefreshFailed(
                "no refresh token held".to_string(),
            ));
        };

        let result = self.api.refresh(&refresh_token).await;

        let outcome = {
            let mut state = self.lock_state();
            match result {
                Ok(response) => {
                    info!("access token refreshed");
                    state.access_token = Some(response.access_token.clone());
                    let restored = if previous.is_transient() {
                        state.settled_status()
                    } else {
                        previous
                    };
                    self.set_status(&mut state, restored);
                    Ok(response.access_token)
                }
                Err(e) => {
                    warn!(error = %e, "token refresh failed, ending session");
                    state.clear();
                    self.set_status(&mut state, SessionStatus::Unauthenticated);
                    Err(SessionError::RefreshFailed(e.to_string()))
                }
            }
        };

        self.persist().await;
        if outcome.is_err() {
            self.redirect.redirect_to_login();
        }
        outcome
    }

    /// Current access token, for collaborators that attach it themselves.
    pub fn access_token(&self) -> Option<String> {
        self.lock_state().access_token.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock_state().status
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock_state().is_authenticated
    }

    pub fn view(&self) -> SessionView {
        let state = self.lock_state();
        SessionView {
            admin: state.admin.clone(),
            is_authenticated: state.is_authenticated,
            status: state.status,
            error: state.error.clone(),
            last_activity_timestamp: state.last_activity,
        }
    }

    /// The persisted subset of the in-memory session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock_state().snapshot()
    }

    /// Receiver notified on every status transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    fn is_idle(&self, state: &SessionState, now: OffsetDateTime) -> bool {
        match state.last_activity {
            Some(last) => (now - last) > self.config.idle_timeout,
            // No activity on record: a held token cannot be vouched for.
            None => state.access_token.is_some(),
        }
    }

    fn set_status(&self, state: &mut SessionState, status: SessionStatus) {
        if state.status != status {
            debug!(from = %state.status, to = %status, "session status");
            state.status = status;
            self.status_tx.send_replace(status);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the latest snapshot, or removes the record once the session is
    /// empty. Failures are logged, never surfaced.
    async fn persist(&self) {
        let _persist = self.persist_lock.lock().await;
        let snapshot = self.snapshot();
        let result = if snapshot.is_empty() {
            self.storage.clear().await
        } else {
            self.storage.save(&snapshot).await
        };
        match result {
            Ok(()) => self.lock_state().persisted_activity = snapshot.last_activity_timestamp,
            Err(e) => warn!(error = %e, "failed to persist session"),
        }
    }
}

struct ClearOnDrop<'a>(&'a SessionManager);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock_state();
        state.clear();
        state.error = None;
        self.0.set_status(&mut state, SessionStatus::Unauthenticated);
    }
}
