//! Authorized API client.
//!
//! Decorates the session's transport: each request picks up the access
//! token persisted at send time, and a 401 on an authorized request runs
//! one (coalesced) refresh before the original response is handed back.
//! `send` and `call` never re-issue the failed request; callers that want
//! one retry with the refreshed token use the `*_retrying` variants.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::session::SessionManager;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::types::{SessionError, error_message};

#[derive(Clone)]
pub struct AuthorizedClient {
    session: Arc<SessionManager>,
}

impl AuthorizedClient {
    #[must_use]
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Send an authorized request and return its JSON body.
    ///
    /// # Errors
    ///
    /// A transport error, or [`SessionError::Rejected`] for any non-2xx
    /// response, after the 401 refresh policy has run.
    pub async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, SessionError> {
        self.execute(build(method, path, body)).await
    }

    /// Like [`AuthorizedClient::call`], but a 401 that led to a successful
    /// refresh re-issues the request once with the new token.
    ///
    /// # Errors
    ///
    /// See [`AuthorizedClient::call`]. A second 401 is returned as is.
    pub async fn call_retrying(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, SessionError> {
        self.execute_retrying(build(method, path, body)).await
    }

    /// Send `request` and return its JSON body; non-2xx becomes
    /// [`SessionError::Rejected`].
    ///
    /// # Errors
    ///
    /// See [`AuthorizedClient::call`].
    pub async fn execute(&self, request: ApiRequest) -> Result<Value, SessionError> {
        let response = self.send(request).await?;
        if !response.is_success() {
            let message = error_message(&response.body).unwrap_or_else(|| format!("HTTP {}", response.status));
            return Err(SessionError::Rejected { status: response.status, message });
        }
        Ok(response.body)
    }

    /// [`AuthorizedClient::execute`] with one retry after a refresh.
    ///
    /// The retry happens only when the session attached the token itself and
    /// a different token is persisted after the 401. A failed refresh has
    /// logged the session out, so there is nothing to retry with.
    ///
    /// # Errors
    ///
    /// See [`AuthorizedClient::call`].
    pub async fn execute_retrying(&self, request: ApiRequest) -> Result<Value, SessionError> {
        let session_token = request.bearer.is_none().then(|| self.session.get_auth_token()).flatten();
        let retry = request.clone();

        match self.execute(request).await {
            Err(SessionError::Rejected { status: 401, .. }) if self.token_replaced(session_token.as_deref()) => {
                tracing::debug!(path = %retry.path, "retrying with refreshed token");
                self.execute(retry).await
            }
            other => other,
        }
    }

    fn token_replaced(&self, sent: Option<&str>) -> bool {
        let Some(sent) = sent else {
            return false;
        };
        self.session.get_auth_token().is_some_and(|current| current != sent)
    }

    /// # Errors
    ///
    /// See [`AuthorizedClient::call`].
    pub async fn get(&self, path: &str) -> Result<Value, SessionError> {
        self.call(Method::GET, path, None).await
    }

    /// # Errors
    ///
    /// See [`AuthorizedClient::call`].
    pub async fn post(&self, path: &str, body: Value) -> Result<Value, SessionError> {
        self.call(Method::POST, path, Some(body)).await
    }
}

fn build(method: Method, path: &str, body: Option<Value>) -> ApiRequest {
    let mut request = ApiRequest::new(method, path);
    request.body = body;
    request
}

#[async_trait::async_trait]
impl HttpTransport for AuthorizedClient {
    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, SessionError> {
        if request.bearer.is_none() {
            request.bearer = self.session.get_auth_token();
        }
        let attached = request.bearer.clone();
        let path = request.path.clone();

        let response = self.session.transport().send(request).await?;

        if response.is_unauthorized() {
            if let Some(rejected) = attached.as_deref() {
                tracing::debug!(%path, "authorized request got 401; refreshing");
                if let Err(error) = self.session.refresh_after_unauthorized(rejected).await {
                    tracing::warn!(%path, %error, "refresh after 401 failed");
                }
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
