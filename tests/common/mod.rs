//! Scripted in-memory transport for driving the realtime service in tests.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use realtime_sub::{
    HttpRequest, HttpResponse, Method, RealtimeConfig, RealtimeError, Result, ResponseBody,
    SyncPayload, Transport,
};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What the next streaming GET returns.
enum StreamScript {
    Open(Receiver<Vec<u8>>),
    Status(u16),
    Fail(String),
}

/// Test side of an open event stream. Dropping it ends the stream.
pub struct StreamFeed {
    sender: Sender<Vec<u8>>,
}

impl StreamFeed {
    pub fn line(&self, line: &str) {
        let _ = self.sender.send(format!("{}\n", line).into_bytes());
    }

    pub fn handshake(&self, client_id: &str) {
        self.line(&format!("data:{{\"clientId\":\"{}\"}}", client_id));
    }

    pub fn event(&self, topic: &str, data: serde_json::Value) {
        let frame = serde_json::json!({ "topic": topic, "data": data });
        self.line(&format!("data:{}", frame));
    }

    pub fn close(self) {}
}

/// Body that blocks on a channel until the feed sends bytes or is dropped.
struct ChannelBody {
    receiver: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for ChannelBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Transport answering GETs from a script and recording every request.
pub struct ScriptedTransport {
    streams: Mutex<VecDeque<StreamScript>>,
    post_status: Mutex<u16>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(VecDeque::new()),
            post_status: Mutex::new(204),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Queue an open stream for the next GET.
    pub fn open_stream(&self) -> StreamFeed {
        let (sender, receiver) = unbounded();
        self.streams.lock().push_back(StreamScript::Open(receiver));
        StreamFeed { sender }
    }

    pub fn refuse_stream(&self, status: u16) {
        self.streams.lock().push_back(StreamScript::Status(status));
    }

    pub fn fail_stream(&self, message: &str) {
        self.streams
            .lock()
            .push_back(StreamScript::Fail(message.to_string()));
    }

    pub fn set_post_status(&self, status: u16) {
        *self.post_status.lock() = status;
    }

    pub fn gets(&self) -> Vec<HttpRequest> {
        self.requests_with(Method::Get)
    }

    pub fn posts(&self) -> Vec<HttpRequest> {
        self.requests_with(Method::Post)
    }

    /// Decoded submit bodies, oldest first.
    pub fn submitted(&self) -> Vec<SyncPayload> {
        self.posts()
            .iter()
            .map(|r| serde_json::from_slice(r.body.as_deref().unwrap_or_default()).unwrap())
            .collect()
    }

    fn requests_with(&self, method: Method) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        self.requests.lock().push(request);

        match method {
            Method::Post => {
                let status = *self.post_status.lock();
                let body = if status == 204 { "" } else { "{\"message\":\"rejected\"}" };
                Ok(HttpResponse::new(status, ResponseBody::from_bytes(body)))
            }
            Method::Get => match self.streams.lock().pop_front() {
                Some(StreamScript::Open(receiver)) => Ok(HttpResponse::new(
                    200,
                    ResponseBody::new(ChannelBody {
                        receiver,
                        pending: Vec::new(),
                        pos: 0,
                    }),
                )),
                Some(StreamScript::Status(status)) => {
                    Ok(HttpResponse::new(status, ResponseBody::empty()))
                }
                Some(StreamScript::Fail(message)) => Err(RealtimeError::Transport(message)),
                None => Err(RealtimeError::Transport("no stream scripted".to_string())),
            },
        }
    }
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn test_config() -> RealtimeConfig {
    RealtimeConfig {
        handshake_timeout: Duration::from_secs(5),
        ..RealtimeConfig::new("http://127.0.0.1:8090", "Bearer test-token")
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
