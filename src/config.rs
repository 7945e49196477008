//! Session client configuration parsed from environment variables.

use std::path::PathBuf;

use crate::types::SessionError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_url: String,
    pub timeouts: HttpTimeouts,
    pub token_file: PathBuf,
}

impl SessionConfig {
    /// Build typed session config from environment variables.
    ///
    /// Optional:
    /// - `CAMPSCOUT_API_URL`: default `http://localhost:8000`
    /// - `CAMPSCOUT_REQUEST_TIMEOUT_SECS`: default 30
    /// - `CAMPSCOUT_CONNECT_TIMEOUT_SECS`: default 10
    /// - `CAMPSCOUT_TOKEN_FILE`: default `$HOME/.campscout/tokens.json`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConfigParse`] if the API URL is not http(s).
    pub fn from_env() -> Result<Self, SessionError> {
        let api_url = parse_api_url(std::env::var("CAMPSCOUT_API_URL").ok().as_deref())?;
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("CAMPSCOUT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("CAMPSCOUT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let token_file = std::env::var("CAMPSCOUT_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_token_file(std::env::var("HOME").ok().as_deref()));

        Ok(Self { api_url, timeouts, token_file })
    }

    /// Replace the API URL, applying the same validation as `from_env`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConfigParse`] if the URL is not http(s).
    pub fn with_api_url(mut self, raw: &str) -> Result<Self, SessionError> {
        self.api_url = parse_api_url(Some(raw))?;
        Ok(self)
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_api_url(raw: Option<&str>) -> Result<String, SessionError> {
    let url = raw.unwrap_or(DEFAULT_API_URL).trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_owned())
    } else {
        Err(SessionError::ConfigParse(format!("invalid CAMPSCOUT_API_URL: {url}")))
    }
}

pub(crate) fn default_token_file(home: Option<&str>) -> PathBuf {
    let base = home.map_or_else(|| PathBuf::from("."), PathBuf::from);
    base.join(".campscout").join("tokens.json")
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
