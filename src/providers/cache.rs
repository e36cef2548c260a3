//! Keyed cache of in-flight and completed fetches.
//!
//! - The first `get_or_fetch` for a key spawns the fetch and stores a slot
//! - Every later call, pending or resolved, receives a handle on that same slot
//! - Failures are stored and replayed; nothing is retried until the entry is invalidated
//!
//! Fetches are spawned on the tokio runtime rather than driven by their
//! waiters, so a fetch keeps running (and fills the cache) after every
//! waiter has been dropped.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::{FetchError, FetchResult};

type Slot<V> = Option<FetchResult<Arc<V>>>;

/// Handle on a cached fetch that may or may not have resolved yet.
pub struct Pending<V> {
    rx: watch::Receiver<Slot<V>>,
}

impl<V> Clone for Pending<V> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<V> Pending<V> {
    /// Wait for the fetch to resolve.
    pub async fn wait(mut self) -> FetchResult<Arc<V>> {
        let resolved = match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        };
        resolved.unwrap_or_else(|| Err(FetchError::unknown("fetch task ended without a result")))
    }

    /// The result if it is already available.
    pub fn peek(&self) -> Option<FetchResult<Arc<V>>> {
        self.rx.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// True if both handles observe the same underlying fetch.
    pub fn same_fetch(&self, other: &Pending<V>) -> bool {
        self.rx.same_channel(&other.rx)
    }
}

/// Cache of fetch results keyed by `K`.
///
/// There is no eviction: the key space is bounded by the items of one page.
pub struct ResourceCache<K, V> {
    name: &'static str,
    /// Check-then-insert happens under this lock, so there is at most one
    /// fetch per key even when callers race from several threads.
    entries: Mutex<HashMap<K, watch::Receiver<Slot<V>>>>,
    fetches_started: AtomicUsize,
}

impl<K, V> ResourceCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            fetches_started: AtomicUsize::new(0),
        }
    }

    /// Return the cached handle for `key`, starting `fetch` if there is none.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Pending<V>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let mut entries = self.entries.lock();
        if let Some(rx) = entries.get(&key) {
            trace!(cache = self.name, ?key, "Cache hit");
            return Pending { rx: rx.clone() };
        }

        let (tx, rx) = watch::channel(None);
        entries.insert(key.clone(), rx.clone());
        drop(entries);

        self.fetches_started.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, ?key, "Cache miss, fetching");

        let name = self.name;
        let fut = fetch(key);
        tokio::spawn(async move {
            let result = fut.await.map(Arc::new);
            if let Err(err) = &result {
                debug!(cache = name, error = %err, "Fetch failed, caching failure");
            }
            tx.send_replace(Some(result));
        });

        Pending { rx }
    }

    /// The handle for `key` if one exists, without starting a fetch.
    pub fn lookup(&self, key: &K) -> Option<Pending<V>> {
        self.entries
            .lock()
            .get(key)
            .map(|rx| Pending { rx: rx.clone() })
    }

    /// Drop the entry for `key`. The next `get_or_fetch` fetches again.
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = self.entries.lock().remove(key).is_some();
        if removed {
            debug!(cache = self.name, ?key, "Invalidated cache entry");
        }
        removed
    }

    /// Drop the entry for `key` only if it resolved to an error.
    pub fn invalidate_failed(&self, key: &K) -> bool {
        let mut entries = self.entries.lock();
        let failed = entries
            .get(key)
            .is_some_and(|rx| matches!(&*rx.borrow(), Some(Err(_))));
        if failed {
            entries.remove(key);
            debug!(cache = self.name, ?key, "Dropped failed cache entry");
        }
        failed
    }

    /// Drop every failed entry whose key matches `pred`.
    pub fn invalidate_failed_where(&self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, rx| !(pred(key) && matches!(&*rx.borrow(), Some(Err(_)))));
        before - entries.len()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of underlying fetches started over the cache's lifetime.
    pub fn fetches_started(&self) -> usize {
        self.fetches_started.load(Ordering::Relaxed)
    }
}
