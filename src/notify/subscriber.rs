//! Subscriber-based notifications for configuration changes.

use crate::core::ConfigSnapshot;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Callback = Arc<dyn Fn(&ConfigSnapshot) + Send + Sync>;

/// Handle for a subscription that can be dropped to unsubscribe.
///
/// When the handle is dropped, the subscription is removed immediately.
pub struct SubscriptionHandle {
    id: usize,
    registry: Weak<Mutex<SubscriberRegistryInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let id = self.id;
            registry
                .lock()
                .subscribers
                .retain(|(sub_id, _)| *sub_id != id);
        }
    }
}

/// Internal subscriber registry state.
struct SubscriberRegistryInner {
    subscribers: Vec<(usize, Callback)>,
    next_id: usize,
}

/// Registry for managing configuration change subscribers.
///
/// Callbacks receive the snapshot that was just materialized. They run on the
/// task that completed the load, so they should be quick.
///
/// # Examples
///
/// ```rust
/// use config_mediator::notify::SubscriberRegistry;
///
/// let registry = SubscriberRegistry::new();
///
/// let handle = registry.subscribe(|snapshot| {
///     println!("Config changed: {} keys", snapshot.configs.len());
/// });
/// assert_eq!(registry.subscriber_count(), 1);
///
/// // Unsubscribe by dropping the handle
/// drop(handle);
/// assert_eq!(registry.subscriber_count(), 0);
/// ```
pub struct SubscriberRegistry {
    inner: Arc<Mutex<SubscriberRegistryInner>>,
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubscriberRegistryInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Subscribe to configuration changes.
    ///
    /// Returns a handle that can be dropped to unsubscribe.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ConfigSnapshot) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));

        SubscriptionHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Notify all subscribers of a configuration change.
    ///
    /// Callbacks are invoked in subscription order, outside the registry lock,
    /// so a callback may itself subscribe or unsubscribe.
    pub fn notify_all(&self, snapshot: &ConfigSnapshot) {
        let callbacks: Vec<Callback> = self
            .inner
            .lock()
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(snapshot);
        }
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SubscriberRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ConfigMap, ConfigMetadata};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(identifier: &str) -> ConfigSnapshot {
        ConfigSnapshot::new(None, ConfigMap::new(), Some(ConfigMetadata::new(identifier)))
    }

    #[test]
    fn test_subscribe_and_notify() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        let _handle = registry.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify_all(&snapshot("v1"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        registry.notify_all(&snapshot("v2"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_receives_snapshot() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let _handle = registry.subscribe(move |snapshot| {
            let identifier = snapshot
                .metadata
                .as_ref()
                .map(|m| m.sync_identifier.clone());
            seen_clone.lock().push(identifier);
        });

        registry.notify_all(&snapshot("v1"));
        registry.notify_all(&snapshot("v2"));

        assert_eq!(
            *seen.lock(),
            vec![Some("v1".to_string()), Some("v2".to_string())]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        let handle = registry.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify_all(&snapshot("v1"));
        drop(handle);
        registry.notify_all(&snapshot("v2"));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_handle_outliving_registry() {
        let registry = SubscriberRegistry::new();
        let handle = registry.subscribe(|_| {});
        drop(registry);
        drop(handle);
    }

    #[test]
    fn test_clone_registry() {
        let registry = SubscriberRegistry::new();
        let registry2 = registry.clone();

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let _handle = registry.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry2.notify_all(&snapshot("v1"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
