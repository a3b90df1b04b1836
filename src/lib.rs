//! # Realtime Subscriptions
//!
//! Client side of a server-sent-event subscription protocol: one long-lived
//! event stream per service, a handshake that issues a client ID, and local
//! topic callbacks kept in sync with the server.
//!
//! ## Core Concepts
//!
//! - **Stream**: a single `GET /api/realtime` connection read by a background thread
//! - **Handshake**: the first frame carrying `clientId`; gates every submission
//! - **Registry**: topic -> callbacks, the source of truth for what we want
//! - **Submission**: `POST /api/realtime` with the full topic set and client ID
//!
//! ## Example
//!
//! ```ignore
//! use realtime_sub::{RealtimeConfig, RealtimeService};
//!
//! let service = RealtimeService::with_reqwest(RealtimeConfig::new(
//!     "http://127.0.0.1:8090",
//!     "Bearer <token>",
//! ))?;
//!
//! let id = service.subscribe("posts", |payload| {
//!     println!("posts changed: {payload}");
//! })?;
//!
//! // Later
//! service.unsubscribe(id)?;
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod gate;
pub mod service;
pub mod stream;
pub mod subscriptions;
pub mod sync;
pub mod transport;

// Re-exports
pub use config::RealtimeConfig;
pub use error::{RealtimeError, Result};
pub use frame::{Frame, FrameDecoder};
pub use gate::HandshakeGate;
pub use service::RealtimeService;
pub use stream::{Session, StreamReader};
pub use subscriptions::{
    Callback, EndReason, LifecycleEvent, LifecycleHandle, SubscriptionId, SubscriptionRegistry,
};
pub use sync::{SubscriptionSynchronizer, SyncPayload};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, ResponseBody, Transport};
