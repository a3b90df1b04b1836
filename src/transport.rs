//! HTTP transport seam.
//!
//! The realtime layer only needs one capability from the outside world:
//! perform an already-authenticated HTTP request and hand back the status and
//! a readable body. Anything that can do that implements [`Transport`]; the
//! default is [`ReqwestTransport`], a thin wrapper over the blocking reqwest
//! client.

use crate::error::{RealtimeError, Result};
use std::fmt;
use std::io::Read;
use std::time::Duration;

/// Request methods used by the realtime protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// An outgoing request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Whole-request timeout (None = no limit, used for the event stream).
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach the Authorization header. Empty values are skipped.
    pub fn authorization(self, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.header("Authorization", value)
        }
    }

    /// Set a JSON body and its content type.
    pub fn json_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self.header("Content-Type", "application/json")
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Look up a header value (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response body: either still streaming or fully buffered.
pub struct ResponseBody(Box<dyn Read + Send>);

impl ResponseBody {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self(Box::new(reader))
    }

    pub fn empty() -> Self {
        Self::new(std::io::empty())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(std::io::Cursor::new(bytes.into()))
    }

    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.0
    }

    /// Drain the body into a string (lossy on invalid UTF-8).
    pub fn read_to_string(mut self) -> Result<String> {
        let mut buf = Vec::new();
        self.0.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseBody(..)")
    }
}

/// A response: status plus body.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs authenticated HTTP requests.
///
/// Implementations must not retry; failures are reported as
/// [`RealtimeError::Transport`].
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by `reqwest::blocking`.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build a client. The client carries no overall timeout so event streams
    /// stay open; per-request timeouts come from [`HttpRequest::timeout`].
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().map_err(|e| {
            RealtimeError::Transport(format!("{} {}: {}", request.method, request.url, e))
        })?;
        let status = response.status().as_u16();
        Ok(HttpResponse::new(status, ResponseBody::new(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = HttpRequest::post("http://h/api/realtime")
            .authorization("Bearer t")
            .json_body(b"{}".to_vec())
            .timeout(Duration::from_secs(1));

        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header_value("authorization"), Some("Bearer t"));
        assert_eq!(req.header_value("Content-Type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
        assert_eq!(req.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_empty_authorization_skipped() {
        let req = HttpRequest::get("http://h").authorization("");
        assert!(req.header_value("Authorization").is_none());
    }

    #[test]
    fn test_body_read_to_string() {
        let body = ResponseBody::from_bytes("nope");
        assert_eq!(body.read_to_string().unwrap(), "nope");
        assert_eq!(ResponseBody::empty().read_to_string().unwrap(), "");
    }
}
