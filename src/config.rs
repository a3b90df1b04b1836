//! Realtime client configuration.

use crate::error::{RealtimeError, Result};
use reqwest::Url;
use std::time::Duration;

/// Path of the realtime endpoint, relative to the base URL.
pub const REALTIME_PATH: &str = "/api/realtime";

/// Realtime service configuration.
#[derive(Clone, Debug)]
pub struct RealtimeConfig {
    /// Base URL of the backend (scheme + host, optionally a port).
    pub base_url: String,

    /// Authorization header value. Sent verbatim when it already carries a
    /// scheme (`Bearer ...`), otherwise prefixed with `Bearer `.
    pub auth_token: String,

    /// How long a submission waits for the server to issue a client ID.
    /// Default: 60s
    pub handshake_timeout: Duration,

    /// Timeout for opening the event stream.
    /// Default: 30s
    pub connect_timeout: Duration,

    /// Timeout for the subscription submit request.
    /// Default: 10s
    pub request_timeout: Duration,

    /// Buffered lifecycle events per watcher before it is dropped.
    /// Default: 64
    pub lifecycle_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            auth_token: String::new(),
            handshake_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            lifecycle_buffer: 64,
        }
    }
}

impl RealtimeConfig {
    /// Config for `base_url` authenticated with `auth_token`, defaults elsewhere.
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: auth_token.into(),
            ..Default::default()
        }
    }

    /// Resolve the realtime endpoint URL.
    ///
    /// The path is replaced, not appended: `http://host/app/` still resolves
    /// to `http://host/api/realtime`.
    pub fn realtime_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RealtimeError::InvalidEndpoint(format!("{}: {}", self.base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(RealtimeError::InvalidEndpoint(self.base_url.clone()));
        }
        url.set_path(REALTIME_PATH);
        url.set_query(None);
        Ok(url.to_string())
    }

    /// The Authorization header value.
    pub fn authorization(&self) -> String {
        let token = self.auth_token.trim();
        if token.is_empty() || token.contains(' ') {
            token.to_string()
        } else {
            format!("Bearer {}", token)
        }
    }
}
