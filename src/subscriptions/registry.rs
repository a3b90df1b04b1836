//! Topic to callback registry.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{Callback, SubscriptionId};

/// Thread-safe mapping from topic to its callbacks.
///
/// The set of topics with at least one callback is exactly what the server
/// must be told we want. Callbacks are never invoked while the lock is held,
/// so a callback may subscribe or unsubscribe re-entrantly.
pub struct SubscriptionRegistry {
    /// Callbacks by topic, in registration order.
    topics: RwLock<HashMap<String, Vec<(SubscriptionId, Callback)>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a callback for `topic`.
    pub fn add_callback(&self, topic: impl Into<String>, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.topics
            .write()
            .entry(topic.into())
            .or_default()
            .push((id, callback));
        id
    }

    /// Remove a single callback. Returns its topic if it was registered.
    pub fn remove(&self, id: SubscriptionId) -> Option<String> {
        let mut topics = self.topics.write();
        let topic = topics
            .iter()
            .find(|(_, callbacks)| callbacks.iter().any(|(cb_id, _)| *cb_id == id))
            .map(|(topic, _)| topic.clone())?;

        if let Some(callbacks) = topics.get_mut(&topic) {
            callbacks.retain(|(cb_id, _)| *cb_id != id);
            if callbacks.is_empty() {
                topics.remove(&topic);
            }
        }
        Some(topic)
    }

    /// Remove every callback for `topic`. Returns how many were removed.
    pub fn remove_topic(&self, topic: &str) -> usize {
        self.topics
            .write()
            .remove(topic)
            .map_or(0, |callbacks| callbacks.len())
    }

    /// Sorted copy of the topics that currently have callbacks.
    pub fn snapshot_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .topics
            .read()
            .iter()
            .filter(|(_, callbacks)| !callbacks.is_empty())
            .map(|(topic, _)| topic.clone())
            .collect();
        topics.sort();
        topics
    }

    /// Invoke every callback for `topic` in registration order.
    /// Returns the number of callbacks invoked.
    pub fn dispatch(&self, topic: &str, payload: &Value) -> usize {
        let callbacks: Vec<Callback> = match self.topics.read().get(topic) {
            Some(callbacks) => callbacks.iter().map(|(_, cb)| cb.clone()).collect(),
            None => return 0,
        };

        for callback in &callbacks {
            callback(payload);
        }
        callbacks.len()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.read().contains_key(topic)
    }

    /// Total number of registered callbacks.
    pub fn len(&self) -> usize {
        self.topics.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.read().is_empty()
    }

    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Callback {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |payload: &Value| log.lock().push(format!("{}:{}", tag, payload)))
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.add_callback("news", recorder(&log, "a"));
        registry.add_callback("news", recorder(&log, "b"));
        registry.add_callback("sports", recorder(&log, "c"));

        assert_eq!(registry.dispatch("news", &json!(1)), 2);
        assert_eq!(*log.lock(), vec!["a:1".to_string(), "b:1".to_string()]);
    }

    #[test]
    fn test_dispatch_unknown_topic() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.dispatch("missing", &json!(null)), 0);
    }

    #[test]
    fn test_snapshot_has_no_duplicates() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add_callback("b", recorder(&log, "x"));
        registry.add_callback("a", recorder(&log, "x"));
        registry.add_callback("b", recorder(&log, "y"));

        assert_eq!(registry.snapshot_topics(), vec!["a", "b"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.topic_count(), 2);
    }

    #[test]
    fn test_remove_drops_empty_topic() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = registry.add_callback("news", recorder(&log, "a"));
        let second = registry.add_callback("news", recorder(&log, "b"));

        assert_eq!(registry.remove(first).as_deref(), Some("news"));
        assert!(registry.contains("news"));
        assert_eq!(registry.remove(second).as_deref(), Some("news"));
        assert!(!registry.contains("news"));
        assert!(registry.snapshot_topics().is_empty());
        assert!(registry.remove(second).is_none());
    }

    #[test]
    fn test_remove_topic() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add_callback("news", recorder(&log, "a"));
        registry.add_callback("news", recorder(&log, "b"));

        assert_eq!(registry.remove_topic("news"), 2);
        assert_eq!(registry.remove_topic("news"), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_callback_can_reenter_registry() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let inner = Arc::clone(&registry);
        registry.add_callback(
            "news",
            Arc::new(move |_: &Value| {
                inner.add_callback("more", Arc::new(|_: &Value| {}));
            }),
        );

        assert_eq!(registry.dispatch("news", &json!({})), 1);
        assert!(registry.contains("more"));
    }
}
