//! Realtime service tying the connection, registry, and synchronizer together.

use crate::config::RealtimeConfig;
use crate::error::{RealtimeError, Result};
use crate::stream::{spawn_reader, ConnectionSlot, ReaderContext, Session, StreamReader};
use crate::subscriptions::{
    EndReason, LifecycleEvent, LifecycleHandle, LifecycleWatchers, SubscriptionId,
    SubscriptionRegistry,
};
use crate::sync::SubscriptionSynchronizer;
use crate::transport::{ReqwestTransport, Transport};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Client-side realtime subscriptions.
///
/// Holds at most one event-stream connection, opened lazily by the first
/// [`subscribe`](Self::subscribe). The stream is not reopened automatically
/// when it ends; watch for [`LifecycleEvent::Ended`] and call
/// [`resubscribe`](Self::resubscribe) to reconnect with the current topics.
pub struct RealtimeService {
    config: RealtimeConfig,
    reader: StreamReader,
    synchronizer: SubscriptionSynchronizer,
    registry: Arc<SubscriptionRegistry>,
    /// The live session, if connected.
    slot: ConnectionSlot,
    watchers: Arc<LifecycleWatchers>,
    next_session: AtomicU64,
}

impl RealtimeService {
    /// Create a service that talks through `transport`. Does not connect.
    pub fn new(config: RealtimeConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let url = config.realtime_url()?;
        let authorization = config.authorization();

        let reader = StreamReader::new(Arc::clone(&transport), url.clone(), authorization.clone());
        let synchronizer = SubscriptionSynchronizer::new(
            transport,
            url,
            authorization,
            config.handshake_timeout,
            config.request_timeout,
        );
        let watchers = Arc::new(LifecycleWatchers::new(config.lifecycle_buffer));

        Ok(Self {
            config,
            reader,
            synchronizer,
            registry: Arc::new(SubscriptionRegistry::new()),
            slot: Arc::new(Mutex::new(None)),
            watchers,
            next_session: AtomicU64::new(1),
        })
    }

    /// Create a service backed by a blocking reqwest client.
    pub fn with_reqwest(config: RealtimeConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.connect_timeout)?;
        Self::new(config, Arc::new(transport))
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Open the event stream unless one is already open.
    ///
    /// Returns once the stream is open; the handshake is awaited later by
    /// submissions.
    pub fn connect(&self) -> Result<()> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Ok(());
        }

        let body = self.reader.open()?;
        let session = Arc::new(Session::new(self.next_session.fetch_add(1, Ordering::SeqCst)));
        self.watchers.broadcast(LifecycleEvent::Connected);

        spawn_reader(
            body,
            ReaderContext {
                session: Arc::clone(&session),
                registry: Arc::clone(&self.registry),
                watchers: Arc::clone(&self.watchers),
                slot: Arc::clone(&self.slot),
            },
        )?;

        debug!(session = session.id(), "reader started");
        *slot = Some(session);
        Ok(())
    }

    /// Register `callback` for `topic` and tell the server.
    ///
    /// If connecting or submitting fails the callback stays registered; it
    /// is included in the next successful submission.
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let topic = topic.into();
        self.connect()?;
        let id = self.registry.add_callback(topic.clone(), Arc::new(callback));
        debug!(topic = %topic, id = id.0, "callback registered");
        self.submit()?;
        Ok(id)
    }

    /// Remove one callback. The server is only told when its topic has no
    /// callbacks left and a connection is open.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let Some(topic) = self.registry.remove(id) else {
            return Ok(());
        };
        if self.registry.contains(&topic) {
            return Ok(());
        }
        self.submit_if_connected()
    }

    /// Remove every callback for `topic`.
    pub fn unsubscribe_topic(&self, topic: &str) -> Result<()> {
        if self.registry.remove_topic(topic) == 0 {
            return Ok(());
        }
        self.submit_if_connected()
    }

    /// Connect if needed and submit the current topic set.
    pub fn resubscribe(&self) -> Result<()> {
        self.connect()?;
        self.submit()
    }

    /// Tear down the current connection, if any.
    ///
    /// Registered callbacks are kept. The reader thread exits after its
    /// pending read returns, so the underlying socket stays open until the
    /// server sends another line (a keep-alive) or closes the stream. A
    /// blocking read cannot be interrupted from another thread.
    pub fn disconnect(&self) {
        let Some(session) = self.slot.lock().take() else {
            return;
        };
        if session.close() {
            info!(session = session.id(), "disconnected");
            self.watchers.broadcast(LifecycleEvent::Ended {
                reason: EndReason::Shutdown,
            });
        }
    }

    pub fn is_connected(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Client ID of the live connection, once the handshake arrived.
    pub fn client_id(&self) -> Option<String> {
        self.current_session().and_then(|s| s.client_id())
    }

    /// Topics that currently have callbacks.
    pub fn topics(&self) -> Vec<String> {
        self.registry.snapshot_topics()
    }

    /// Watch connection lifecycle events.
    pub fn watch(&self) -> LifecycleHandle {
        self.watchers.watch()
    }

    fn current_session(&self) -> Option<Arc<Session>> {
        self.slot.lock().clone()
    }

    fn submit(&self) -> Result<()> {
        let session = self.current_session().ok_or(RealtimeError::StreamClosed)?;
        self.synchronizer.submit(&session, &self.registry)
    }

    fn submit_if_connected(&self) -> Result<()> {
        match self.current_session() {
            Some(session) => self.synchronizer.submit(&session, &self.registry),
            None => Ok(()),
        }
    }
}

impl Drop for RealtimeService {
    fn drop(&mut self) {
        self.disconnect();
    }
}
