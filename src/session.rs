//! Session manager — identity, token pair and their lifecycle.
//!
//! ARCHITECTURE
//! ============
//! `SessionManager` is constructed explicitly with a transport and a token
//! store and shared behind an `Arc`. In-memory state holds only the user,
//! the last error and the state-machine phase; tokens are always read from
//! the store.
//!
//! REFRESH
//! =======
//! Refreshes are serialized by an async gate. A refresh triggered by a 401
//! re-reads the access token once it holds the gate: if the rejected token
//! has already been replaced (or cleared by a failed refresh) it returns
//! without calling the API, so concurrent 401s cost one refresh.
//!
//! Every logout and every adopted token pair starts a new session epoch. A
//! refresh records the epoch before it goes to the network and commits its
//! token only if the epoch is unchanged, so a logout (or a fresh login) that
//! lands while the refresh is in flight is never overwritten.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;

use crate::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::types::{
    AuthFailure, MeResponse, Phase, RefreshResponse, RegisterProfile, Session, SessionError, TokenPairResponse, User,
    error_message,
};

pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const GOOGLE_AUTH_PATH: &str = "/api/auth/google";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const ME_PATH: &str = "/api/auth/me";

const REGISTER_FAILED: &str = "Registration failed";
const LOGIN_FAILED: &str = "Login failed";
const GOOGLE_AUTH_FAILED: &str = "Google authentication failed";
const REFRESH_FAILED: &str = "Token refresh failed";
const IDENTITY_CHECK_FAILED: &str = "Authentication check failed";

#[derive(Debug, Default)]
struct SessionState {
    current_user: Option<User>,
    last_error: Option<String>,
    phase: Phase,
    epoch: u64,
}

impl SessionState {
    fn next_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}

pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
    refresh_gate: AsyncMutex<()>,
}

impl SessionManager {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<dyn TokenStore>) -> Self {
        Self { transport, store, state: Mutex::new(SessionState::default()), refresh_gate: AsyncMutex::new(()) }
    }

    /// Transport used for the manager's own calls.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    /// Hydrate from the token store and validate the access token against
    /// `GET /api/auth/me`. A rejected token is discarded together with the
    /// refresh token. Never fails.
    pub async fn initialize(&self) {
        self.with_state(|s| s.phase = Phase::Initializing);

        let Some(token) = self.load_token(ACCESS_TOKEN_KEY) else {
            tracing::debug!("no persisted session");
            self.with_state(|s| {
                s.current_user = None;
                s.phase = Phase::Unauthenticated;
            });
            return;
        };

        match self.fetch_identity(&token).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "restored persisted session");
                self.with_state(|s| {
                    s.current_user = Some(user);
                    s.phase = Phase::Authenticated;
                });
            }
            Err(error) => {
                tracing::warn!(%error, "persisted session rejected; discarding tokens");
                self.with_state(|s| {
                    s.next_epoch();
                    self.clear_tokens();
                    s.current_user = None;
                    s.phase = Phase::Unauthenticated;
                });
            }
        }
    }

    async fn fetch_identity(&self, token: &str) -> Result<User, SessionError> {
        let response = self.transport.send(ApiRequest::get(ME_PATH).with_bearer(token)).await?;
        if !response.is_success() {
            return Err(rejected(&response, IDENTITY_CHECK_FAILED));
        }
        let body: MeResponse =
            serde_json::from_value(response.body).map_err(|e| SessionError::MalformedResponse(e.to_string()))?;
        Ok(body.user)
    }

    // =========================================================================
    // CREDENTIAL EXCHANGE
    // =========================================================================

    /// Create an account via `POST /api/auth/register` and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns the server's message, or "Registration failed", which is also
    /// recorded as the session's last error.
    pub async fn register(&self, profile: &RegisterProfile) -> Result<User, AuthFailure> {
        let body = json!({
            "first_name": profile.first_name,
            "last_name": profile.last_name,
            "email": profile.email,
            "password": profile.password,
        });
        self.authenticate(ApiRequest::post(REGISTER_PATH, body), REGISTER_FAILED).await
    }

    /// Sign in via `POST /api/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns the server's message, or "Login failed", which is also
    /// recorded as the session's last error.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthFailure> {
        let body = json!({ "email": email, "password": password });
        self.authenticate(ApiRequest::post(LOGIN_PATH, body), LOGIN_FAILED).await
    }

    /// Exchange a Google ID credential via `POST /api/auth/google`.
    ///
    /// # Errors
    ///
    /// Returns the server's message, or "Google authentication failed", which
    /// is also recorded as the session's last error.
    pub async fn google_auth(&self, credential: &str) -> Result<User, AuthFailure> {
        let body = json!({ "credential": credential });
        self.authenticate(ApiRequest::post(GOOGLE_AUTH_PATH, body), GOOGLE_AUTH_FAILED).await
    }

    async fn authenticate(&self, request: ApiRequest, fallback: &str) -> Result<User, AuthFailure> {
        self.clear_error();
        let path = request.path.clone();

        let result = self
            .exchange(request, fallback)
            .await
            .and_then(|pair| self.adopt_token_pair(pair, fallback));

        match result {
            Ok(user) => {
                tracing::info!(%path, user_id = %user.id, "authenticated");
                Ok(user)
            }
            Err(failure) => {
                tracing::warn!(%path, status = ?failure.status, message = %failure.message, "authentication failed");
                self.with_state(|s| s.last_error = Some(failure.message.clone()));
                Err(failure)
            }
        }
    }

    async fn exchange(&self, request: ApiRequest, fallback: &str) -> Result<TokenPairResponse, AuthFailure> {
        let response = self.transport.send(request).await.map_err(|error| {
            tracing::debug!(%error, "credential exchange transport failure");
            AuthFailure { message: fallback.to_owned(), status: None }
        })?;

        if !response.is_success() {
            let message = error_message(&response.body).unwrap_or_else(|| fallback.to_owned());
            return Err(AuthFailure { message, status: Some(response.status) });
        }

        serde_json::from_value(response.body).map_err(|error| {
            tracing::debug!(%error, "credential exchange response malformed");
            AuthFailure { message: fallback.to_owned(), status: Some(response.status) }
        })
    }

    fn adopt_token_pair(&self, pair: TokenPairResponse, fallback: &str) -> Result<User, AuthFailure> {
        let persisted = self.with_state(|s| {
            s.next_epoch();
            self.store
                .save(ACCESS_TOKEN_KEY, &pair.access_token)
                .and_then(|()| self.store.save(REFRESH_TOKEN_KEY, &pair.refresh_token))
        });

        if let Err(error) = persisted {
            // A half-written pair must not authorize anything.
            tracing::error!(%error, "failed to persist token pair");
            self.logout();
            return Err(AuthFailure { message: fallback.to_owned(), status: None });
        }

        let user = pair.user;
        self.with_state(|s| {
            s.current_user = Some(user.clone());
            s.phase = Phase::Authenticated;
        });
        Ok(user)
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// Mint a new access token with the persisted refresh token.
    ///
    /// Any failure, including a missing refresh token, logs the session out
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingRefreshToken`], a transport error, a rejection
    /// from the refresh endpoint, or a storage error.
    pub async fn refresh(&self) -> Result<String, SessionError> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh after `rejected` drew a 401, unless a refresh that ran while
    /// this caller waited has already settled the outcome.
    pub(crate) async fn refresh_after_unauthorized(&self, rejected: &str) -> Result<String, SessionError> {
        let _gate = self.refresh_gate.lock().await;
        match self.load_token(ACCESS_TOKEN_KEY) {
            Some(current) if current != rejected => {
                tracing::debug!("access token already refreshed");
                Ok(current)
            }
            None => Err(SessionError::LoggedOut),
            Some(_) => self.refresh_locked().await,
        }
    }

    async fn refresh_locked(&self) -> Result<String, SessionError> {
        let epoch = self.with_state(|s| s.epoch);
        match self.try_refresh(epoch).await {
            Ok(token) => {
                tracing::info!("access token refreshed");
                Ok(token)
            }
            Err(error) if self.with_state(|s| s.epoch) != epoch => {
                // The session this refresh belonged to is already gone.
                tracing::debug!(%error, "refresh superseded by logout or login");
                Err(SessionError::LoggedOut)
            }
            Err(error) => {
                tracing::warn!(%error, "token refresh failed; logging out");
                self.logout();
                Err(error)
            }
        }
    }

    async fn try_refresh(&self, epoch: u64) -> Result<String, SessionError> {
        let refresh_token = self.store.load(REFRESH_TOKEN_KEY)?.ok_or(SessionError::MissingRefreshToken)?;

        let request = ApiRequest::post(REFRESH_PATH, json!({})).with_bearer(refresh_token);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(rejected(&response, REFRESH_FAILED));
        }

        let body: RefreshResponse =
            serde_json::from_value(response.body).map_err(|e| SessionError::MalformedResponse(e.to_string()))?;

        // A token without a known identity is not a session.
        let user = match body.user {
            Some(user) => Some(user),
            None if self.current_user().is_none() => Some(self.fetch_identity(&body.access_token).await?),
            None => None,
        };

        self.with_state(|s| {
            if s.epoch != epoch {
                return Err(SessionError::LoggedOut);
            }
            self.store.save(ACCESS_TOKEN_KEY, &body.access_token)?;
            if let Some(user) = user {
                s.current_user = Some(user);
            }
            s.phase = Phase::Authenticated;
            Ok(())
        })?;
        Ok(body.access_token)
    }

    // =========================================================================
    // LOGOUT / ERRORS
    // =========================================================================

    /// Drop the persisted tokens and the identity. Idempotent.
    pub fn logout(&self) {
        self.with_state(|s| {
            s.next_epoch();
            self.clear_tokens();
            s.current_user = None;
            s.last_error = None;
            s.phase = Phase::Unauthenticated;
        });
        tracing::info!("session cleared");
    }

    pub fn clear_error(&self) {
        self.with_state(|s| s.last_error = None);
    }

    fn clear_tokens(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(error) = self.store.remove(key) {
                tracing::warn!(%error, key, "failed to clear persisted token");
            }
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Currently persisted access token.
    #[must_use]
    pub fn get_auth_token(&self) -> Option<String> {
        self.load_token(ACCESS_TOKEN_KEY)
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.with_state(|s| s.current_user.clone())
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.with_state(|s| s.last_error.clone())
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.with_state(|s| s.phase)
    }

    #[must_use]
    pub fn is_loading_initial(&self) -> bool {
        self.phase() == Phase::Initializing
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.with_state(|s| s.current_user.is_some())
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        let (current_user, last_error, phase) =
            self.with_state(|s| (s.current_user.clone(), s.last_error.clone(), s.phase));
        Session {
            current_user,
            access_token: self.load_token(ACCESS_TOKEN_KEY),
            refresh_token: self.load_token(REFRESH_TOKEN_KEY),
            last_error,
            is_loading_initial: phase == Phase::Initializing,
            phase,
        }
    }

    fn load_token(&self, key: &str) -> Option<String> {
        self.store.load(key).unwrap_or_else(|error| {
            tracing::warn!(%error, key, "failed to read persisted token");
            None
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

fn rejected(response: &ApiResponse, fallback: &str) -> SessionError {
    SessionError::Rejected {
        status: response.status,
        message: error_message(&response.body).unwrap_or_else(|| fallback.to_owned()),
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
