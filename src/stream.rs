//! The persistent event-stream connection and its background reader.

use crate::error::{RealtimeError, Result};
use crate::frame::{Frame, FrameDecoder};
use crate::gate::HandshakeGate;
use crate::subscriptions::{EndReason, LifecycleEvent, LifecycleWatchers, SubscriptionRegistry};
use crate::transport::{HttpRequest, ResponseBody, Transport};
use parking_lot::{Mutex, RwLock};
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Holder of the (at most one) live session of a service.
pub(crate) type ConnectionSlot = Arc<Mutex<Option<Arc<Session>>>>;

/// State shared between one connection's reader and its submitters.
#[derive(Debug)]
pub struct Session {
    id: u64,
    gate: HandshakeGate,
    /// Latest client ID seen on this connection.
    client_id: RwLock<Option<String>>,
    /// Set once the connection is torn down.
    closed: AtomicBool,
}

impl Session {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            gate: HandshakeGate::new(),
            client_id: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn gate(&self) -> &HandshakeGate {
        &self.gate
    }

    pub fn client_id(&self) -> Option<String> {
        self.client_id.read().clone()
    }

    /// Record a client ID from a handshake frame. The stored ID always
    /// follows the latest frame; the gate only opens on the first one.
    /// Returns true if this call opened the gate.
    pub fn record_client_id(&self, client_id: &str) -> bool {
        *self.client_id.write() = Some(client_id.to_string());
        self.gate.signal(client_id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the session closed and release gate waiters.
    /// Returns true for the caller that actually closed it.
    pub(crate) fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            *self.client_id.write() = None;
            self.gate.close();
        }
        first
    }
}

/// Opens the event stream.
pub struct StreamReader {
    transport: Arc<dyn Transport>,
    url: String,
    authorization: String,
}

impl StreamReader {
    pub fn new(transport: Arc<dyn Transport>, url: String, authorization: String) -> Self {
        Self {
            transport,
            url,
            authorization,
        }
    }

    /// Issue the streaming GET. Returns the live body on status 200.
    pub fn open(&self) -> Result<ResponseBody> {
        let request = HttpRequest::get(&self.url)
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .authorization(&self.authorization);

        let response = self.transport.send(request)?;
        if response.status != 200 {
            warn!(status = response.status, url = %self.url, "event stream refused");
            return Err(RealtimeError::Connection {
                status: response.status,
            });
        }

        info!(url = %self.url, "event stream opened");
        Ok(response.body)
    }
}

/// Everything the background reader touches.
pub(crate) struct ReaderContext {
    pub session: Arc<Session>,
    pub registry: Arc<SubscriptionRegistry>,
    pub watchers: Arc<LifecycleWatchers>,
    pub slot: ConnectionSlot,
}

/// Start the reader thread for `body`.
pub(crate) fn spawn_reader(body: ResponseBody, ctx: ReaderContext) -> Result<JoinHandle<()>> {
    let name = format!("realtime-reader-{}", ctx.session.id);
    let handle = thread::Builder::new().name(name).spawn(move || {
        let reason = read_frames(BufReader::new(body.into_reader()), &ctx);
        finish(&ctx, reason);
    })?;
    Ok(handle)
}

/// Decode frames until the stream ends, fails, or the session is closed.
/// The reader is consumed, so returning drops the connection.
fn read_frames<R: BufRead>(mut reader: R, ctx: &ReaderContext) -> EndReason {
    let mut decoder = FrameDecoder::new();
    let mut buf = Vec::new();

    loop {
        if ctx.session.is_closed() {
            return EndReason::Shutdown;
        }

        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return EndReason::EndOfStream,
            Ok(_) => {}
            Err(e) => return EndReason::ReadError(e.to_string()),
        }

        if ctx.session.is_closed() {
            return EndReason::Shutdown;
        }

        let line = String::from_utf8_lossy(&buf);
        match decoder.feed_line(&line) {
            None => {}
            Some(Ok(Frame::Handshake { client_id })) => {
                if ctx.session.record_client_id(&client_id) {
                    info!(client_id = %client_id, "received client ID");
                    ctx.watchers
                        .broadcast(LifecycleEvent::Handshake { client_id });
                } else {
                    debug!(client_id = %client_id, "client ID updated after handshake");
                }
            }
            Some(Ok(Frame::Event { topic, payload })) => {
                let invoked = ctx.registry.dispatch(&topic, &payload);
                debug!(topic = %topic, invoked, "dispatched event");
            }
            Some(Err(e)) => {
                warn!(error = %e, "skipping undecodable frame");
            }
        }
    }
}

fn finish(ctx: &ReaderContext, reason: EndReason) {
    match &reason {
        EndReason::EndOfStream => info!(session = ctx.session.id, "event stream ended"),
        EndReason::ReadError(e) => {
            warn!(session = ctx.session.id, error = %e, "event stream read failed")
        }
        EndReason::Shutdown => debug!(session = ctx.session.id, "reader stopped after shutdown"),
    }

    if !ctx.session.close() {
        // Already torn down by disconnect, which owns the notification.
        return;
    }

    {
        let mut slot = ctx.slot.lock();
        if slot
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &ctx.session))
        {
            *slot = None;
        }
    }

    ctx.watchers.broadcast(LifecycleEvent::Ended { reason });
}
