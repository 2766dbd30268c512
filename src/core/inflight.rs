//! Coalescing of concurrent loads for the same key.
//!
//! Each key maps to a weak handle on a shared future. Callers that find a live
//! handle join it; otherwise they start a new load. The entry is removed when
//! the load settles, and also when every waiter has been dropped, so that a
//! cancelled load never blocks a later one.

use super::LoadKey;
use crate::error::Result;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

type LoadFuture = BoxFuture<'static, Result<()>>;

struct Entry {
    id: u64,
    handle: WeakShared<LoadFuture>,
}

/// Registry of loads currently in flight, keyed by [`LoadKey`].
#[derive(Default)]
pub(crate) struct InflightLoads {
    entries: Mutex<HashMap<LoadKey, Entry>>,
    next_id: AtomicU64,
}

impl InflightLoads {
    /// Join the load running for `key`, or start one with `start`.
    ///
    /// `start` receives the id the new load must pass to [`settle`](Self::settle)
    /// once it completes. It is only called when no live load exists.
    pub(crate) fn join_or_start<F>(&self, key: &LoadKey, start: F) -> InflightLoad<'_>
    where
        F: FnOnce(u64) -> LoadFuture,
    {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(key) {
            if let Some(shared) = entry.handle.upgrade() {
                return InflightLoad {
                    loads: self,
                    key: key.clone(),
                    id: entry.id,
                    shared: Some(shared),
                    joined: true,
                };
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = start(id).shared();
        match shared.downgrade() {
            Some(handle) => {
                entries.insert(key.clone(), Entry { id, handle });
            }
            None => {
                entries.remove(key);
            }
        }

        InflightLoad {
            loads: self,
            key: key.clone(),
            id,
            shared: Some(shared),
            joined: false,
        }
    }

    /// Forget the load `id` for `key`, if it is still the registered one.
    pub(crate) fn settle(&self, key: &LoadKey, id: u64) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|entry| entry.id == id) {
            entries.remove(key);
        }
    }

    /// Forget the load `id` for `key` if nobody is waiting on it anymore.
    fn release_if_abandoned(&self, key: &LoadKey, id: u64) {
        let mut entries = self.entries.lock();
        let abandoned = entries
            .get(key)
            .is_some_and(|entry| entry.id == id && entry.handle.upgrade().is_none());
        if abandoned {
            entries.remove(key);
        }
    }

    /// Number of keys with a registered load.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// One caller's participation in an in-flight load.
pub(crate) struct InflightLoad<'a> {
    loads: &'a InflightLoads,
    key: LoadKey,
    id: u64,
    shared: Option<Shared<LoadFuture>>,
    joined: bool,
}

impl InflightLoad<'_> {
    /// Whether this caller joined a load started by someone else.
    pub(crate) fn joined(&self) -> bool {
        self.joined
    }

    /// Wait for the load to settle.
    pub(crate) async fn wait(mut self) -> Result<()> {
        match self.shared.as_mut() {
            Some(shared) => shared.await,
            None => Ok(()),
        }
    }
}

impl Drop for InflightLoad<'_> {
    fn drop(&mut self) {
        // Release our strong handle first so the abandonment check sees it gone.
        self.shared.take();
        self.loads.release_if_abandoned(&self.key, self.id);
    }
}
