//! Line-oriented decoding of the realtime event stream.

use crate::error::{RealtimeError, Result};
use serde_json::Value;
use tracing::{debug, trace};

/// Prefix of payload-carrying lines.
pub const DATA_PREFIX: &str = "data:";

/// Prefix of event-name lines.
pub const EVENT_PREFIX: &str = "event:";

/// Field carrying the session identifier in the handshake frame.
pub const CLIENT_ID_FIELD: &str = "clientId";

/// A decoded unit from the event stream.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// The server issued the session identifier for this connection.
    Handshake { client_id: String },
    /// A pushed event for a topic.
    Event { topic: String, payload: Value },
}

/// Per-connection decoder state.
///
/// Only `data:` lines produce frames. The most recent `event:` name is kept
/// until the next blank line and serves as the topic for data frames that do
/// not name one themselves.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    event_name: Option<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. `None` means the line carried nothing to act on.
    pub fn feed_line(&mut self, line: &str) -> Option<Result<Frame>> {
        let line = line.trim();

        if line.is_empty() {
            self.event_name = None;
            return None;
        }

        if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
            let name = name.trim();
            self.event_name = (!name.is_empty()).then(|| name.to_string());
            return None;
        }

        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            trace!(line, "ignoring non-data line");
            return None;
        };

        match serde_json::from_str::<Value>(data.trim()) {
            Ok(value) => self.classify(value),
            Err(e) => Some(Err(RealtimeError::Decode(format!("{}: {:?}", e, data)))),
        }
    }

    fn classify(&self, value: Value) -> Option<Result<Frame>> {
        if let Some(id) = value.get(CLIENT_ID_FIELD).and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(Ok(Frame::Handshake {
                    client_id: id.to_string(),
                }));
            }
        }

        let topic = value
            .get("topic")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.event_name.clone());

        let Some(topic) = topic else {
            debug!("data frame without topic, skipping");
            return None;
        };

        let payload = match value {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };

        Some(Ok(Frame::Event { topic, payload }))
    }
}
