//! Subscription bookkeeping for the realtime client.
//!
//! This module holds the local side of subscriptions:
//! - The topic registry that callbacks live in
//! - Lifecycle notifications for the underlying event stream
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriptionRegistry::new();
//! let id = registry.add_callback("posts", Arc::new(|payload| println!("{payload}")));
//!
//! registry.dispatch("posts", &json!({"action": "create"}));
//! registry.remove(id);
//! ```

mod lifecycle;
mod registry;
mod types;

pub use lifecycle::LifecycleWatchers;
pub use registry::SubscriptionRegistry;
pub use types::{Callback, EndReason, LifecycleEvent, LifecycleHandle, SubscriptionId};
