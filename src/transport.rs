//! HTTP transport seam.
//!
//! `HttpTransport` is the only way the session reaches the network. Non-2xx
//! statuses come back as ordinary [`ApiResponse`] values so the callers that
//! care about 401 can see them; only failures that never produced a response
//! are errors here.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::config::HttpTimeouts;
use crate::types::SessionError;

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// One API call, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    /// Query string pairs, encoded by the transport.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Credential sent as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, bearer: None }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body, `Value::Null` when the body was empty or not JSON.
    pub body: Value,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Sends API requests. Implemented over `reqwest`, by the authorized
/// decorator, and by test mocks.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] when no response was received.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError>;
}

// =============================================================================
// REQWEST TRANSPORT
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`SessionError::HttpClientBuild`] if the client cannot be built.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| SessionError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let url = self.url(&request.path);
        tracing::debug!(method = %request.method, %url, authorized = request.bearer.is_some(), "api request");

        let mut builder = self.http.request(request.method, &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        tracing::debug!(%url, status, "api response");
        Ok(ApiResponse { status, body: parse_body(&text) })
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub(crate) fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or(Value::Null)
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, SessionError> + Send + Sync>;

    /// Transport answering from a closure and recording every request.
    ///
    /// Each `send` yields once before answering so concurrent callers
    /// interleave the way they would over a real socket.
    pub struct MockTransport {
        handler: Handler,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        pub fn new(handler: impl Fn(&ApiRequest) -> Result<ApiResponse, SessionError> + Send + Sync + 'static) -> Self {
            Self { handler: Box::new(handler), requests: Mutex::new(Vec::new()) }
        }

        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        pub fn count(&self, path: &str) -> usize {
            self.requests().iter().filter(|r| r.path == path).count()
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            tokio::task::yield_now().await;
            (self.handler)(&request)
        }
    }

    pub fn ok(body: Value) -> Result<ApiResponse, SessionError> {
        Ok(ApiResponse::new(200, body))
    }

    pub fn status(code: u16, body: Value) -> Result<ApiResponse, SessionError> {
        Ok(ApiResponse::new(code, body))
    }

    pub fn user_json(id: i64, email: &str) -> Value {
        serde_json::json!({ "id": id, "email": email })
    }

    pub fn token_pair(access: &str, refresh: &str, email: &str) -> Value {
        serde_json::json!({ "access_token": access, "refresh_token": refresh, "user": user_json(1, email) })
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
