//! Error types for the realtime subscription layer.

use std::time::Duration;
use thiserror::Error;

/// Main error type for realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Unexpected status opening event stream: {status}")]
    Connection { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0:?} waiting for client ID")]
    HandshakeTimeout(Duration),

    #[error("Subscription submit rejected: status {status}, body {body:?}")]
    Sync { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Event stream closed before handshake")]
    StreamClosed,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RealtimeError {
    fn from(e: serde_json::Error) -> Self {
        RealtimeError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for RealtimeError {
    fn from(e: reqwest::Error) -> Self {
        RealtimeError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for RealtimeError {
    fn from(e: std::io::Error) -> Self {
        RealtimeError::Transport(e.to_string())
    }
}

/// Result type for realtime operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;
