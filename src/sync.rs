//! Pushing the local topic set to the server.

use crate::error::{RealtimeError, Result};
use crate::stream::Session;
use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{HttpRequest, Transport};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Body of the subscription submit request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub client_id: String,
    pub subscriptions: Vec<String>,
}

/// Tells the server the full set of topics we want, tagged with the client ID
/// of the live connection.
pub struct SubscriptionSynchronizer {
    transport: Arc<dyn Transport>,
    url: String,
    authorization: String,
    handshake_timeout: Duration,
    request_timeout: Duration,
    /// Serializes snapshot + send so the last request carries the newest set.
    submit_lock: Mutex<()>,
}

impl SubscriptionSynchronizer {
    pub fn new(
        transport: Arc<dyn Transport>,
        url: String,
        authorization: String,
        handshake_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            url,
            authorization,
            handshake_timeout,
            request_timeout,
            submit_lock: Mutex::new(()),
        }
    }

    /// Submit the registry's current topics for `session`.
    ///
    /// Waits for the handshake first; on timeout nothing is sent. Every call
    /// sends one request, even if the topic set did not change.
    pub fn submit(&self, session: &Session, registry: &SubscriptionRegistry) -> Result<()> {
        session.gate().wait(self.handshake_timeout)?;
        // Closing the session clears its client ID
        let client_id = session.client_id().ok_or(RealtimeError::StreamClosed)?;

        let _guard = self.submit_lock.lock();
        let payload = SyncPayload {
            client_id,
            subscriptions: registry.snapshot_topics(),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| RealtimeError::Serialization(e.to_string()))?;

        let request = HttpRequest::post(&self.url)
            .json_body(body)
            .authorization(&self.authorization)
            .timeout(self.request_timeout);

        let response = self.transport.send(request)?;
        if response.status == 204 {
            debug!(
                client_id = %payload.client_id,
                topics = payload.subscriptions.len(),
                "subscriptions submitted"
            );
            return Ok(());
        }

        let status = response.status;
        let body = response.body.read_to_string().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read submit response body");
            String::new()
        });
        warn!(status, body = %body, "subscription submit rejected");
        Err(RealtimeError::Sync { status, body })
    }
}
