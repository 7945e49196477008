//! Session types — user profile, wire payloads and errors.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by session, transport and storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The API answered with a non-success status.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// A success response did not carry the expected fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A request payload could not be encoded as JSON.
    #[error("request encoding failed: {0}")]
    Encode(String),

    /// A refresh was requested but no refresh token is persisted.
    #[error("no refresh token")]
    MissingRefreshToken,

    /// The session was logged out, or replaced by a new login, while this
    /// call waited on or ran a refresh.
    #[error("session logged out")]
    LoggedOut,

    /// The token store could not be read or written.
    #[error("token storage failed: {0}")]
    Storage(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),
}

/// Human-readable failure of `login`, `register` or `google_auth`.
///
/// `message` is what the session also records as its last error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
    /// HTTP status when the server answered, `None` for transport failures.
    pub status: Option<u16>,
}

// =============================================================================
// USER
// =============================================================================

/// User identifier. The backend issues UUID strings; numeric ids are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Profile of the authenticated user as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notification_preferences: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Registration form input.
#[derive(Debug, Clone)]
pub struct RegisterProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

// =============================================================================
// SESSION
// =============================================================================

/// Position in the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Point-in-time view of the session. Tokens are read from the store when
/// the snapshot is taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub current_user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub last_error: Option<String>,
    pub is_loading_initial: bool,
    pub phase: Phase,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Body of a successful register, login or Google exchange.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MeResponse {
    pub user: User,
}

/// Pull the human-readable message out of an API error body.
///
/// Prefers `error`, then the FastAPI-style `detail` string.
#[must_use]
pub fn error_message(body: &serde_json::Value) -> Option<String> {
    ["error", "detail"]
        .iter()
        .find_map(|key| body.get(key).and_then(serde_json::Value::as_str))
        .filter(|message| !message.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
