//! Subscription and lifecycle types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Handler invoked with an event's payload.
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Unique identifier for a registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Connection lifecycle notifications.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The event stream was opened.
    Connected,
    /// The server issued a client ID for the current connection.
    Handshake { client_id: String },
    /// The event stream ended. No reconnection is attempted.
    Ended { reason: EndReason },
}

/// Why the event stream ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The server closed the stream.
    EndOfStream,
    /// Reading from the stream failed.
    ReadError(String),
    /// The service disconnected locally.
    Shutdown,
}

/// Receiving end of a lifecycle watch.
pub struct LifecycleHandle {
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<LifecycleEvent>,
}

impl LifecycleHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<LifecycleEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<LifecycleEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<LifecycleEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
