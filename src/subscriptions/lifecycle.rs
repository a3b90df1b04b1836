//! Broadcasting connection lifecycle events to watchers.

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use tracing::debug;

use super::types::{LifecycleEvent, LifecycleHandle};

/// Fan-out of lifecycle events. Watchers whose buffer is full or whose
/// receiver is gone are dropped.
pub struct LifecycleWatchers {
    senders: Mutex<Vec<Sender<LifecycleEvent>>>,
    buffer_size: usize,
}

impl LifecycleWatchers {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Register a new watcher.
    pub fn watch(&self) -> LifecycleHandle {
        let (sender, receiver) = bounded(self.buffer_size);
        self.senders.lock().push(sender);
        LifecycleHandle { receiver }
    }

    /// Send `event` to every watcher.
    pub fn broadcast(&self, event: LifecycleEvent) {
        let mut senders = self.senders.lock();
        let before = senders.len();
        senders.retain(|sender| sender.try_send(event.clone()).is_ok());
        let dropped = before - senders.len();
        if dropped > 0 {
            debug!(dropped, "dropped lifecycle watchers");
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.senders.lock().len()
    }
}
