use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

use super::stats::{CacheCounters, CacheStats};
use crate::error::{MetadataError, Result};

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T>>>;

/// A stored value. Written once when its load succeeds, dropped by `flush`.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub loaded_at: DateTime<Utc>,
}

/// What a [`KeyedCache::flush`] discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub entries_cleared: usize,
    pub loads_cancelled: usize,
}

impl Add for FlushOutcome {
    type Output = FlushOutcome;

    fn add(self, other: FlushOutcome) -> FlushOutcome {
        FlushOutcome {
            entries_cleared: self.entries_cleared + other.entries_cleared,
            loads_cancelled: self.loads_cancelled + other.loads_cancelled,
        }
    }
}

struct InFlight<T> {
    id: u64,
    load: SharedLoad<T>,
    abort: AbortHandle,
}

struct State<K, T> {
    entries: HashMap<K, CacheEntry<T>>,
    in_flight: HashMap<K, InFlight<T>>,
}

struct CacheInner<K, T> {
    name: &'static str,
    state: Mutex<State<K, T>>,
    counters: CacheCounters,
    next_load_id: AtomicU64,
}

impl<K, T> CacheInner<K, T>
where
    K: Eq + Hash + Clone + fmt::Display,
    T: Clone,
{
    /// Records the outcome of load `load_id`, unless a flush replaced it.
    fn settle(&self, key: &K, load_id: u64, result: &Result<T>) {
        let mut state = self.state.lock();
        let current = state
            .in_flight
            .get(key)
            .map_or(false, |flight| flight.id == load_id);
        if !current {
            trace!(cache = self.name, key = %key, "Discarding result of a flushed load");
            return;
        }
        state.in_flight.remove(key);

        match result {
            Ok(value) => {
                state.entries.insert(
                    key.clone(),
                    CacheEntry {
                        value: value.clone(),
                        loaded_at: Utc::now(),
                    },
                );
                debug!(cache = self.name, key = %key, "Stored entry");
            }
            Err(err) => {
                self.counters.record_failure();
                warn!(cache = self.name, key = %key, error = %err, "Load failed");
            }
        }
    }

    /// Drops the in-flight lock of a load whose task never settled.
    fn release(&self, key: &K, load_id: u64) {
        let mut state = self.state.lock();
        if state
            .in_flight
            .get(key)
            .map_or(false, |flight| flight.id == load_id)
        {
            state.in_flight.remove(key);
        }
    }
}

enum Lookup<T> {
    Hit(T),
    Wait(SharedLoad<T>),
}

/// Session-scoped async cache with per-key request coalescing.
///
/// For any key, at most one loader runs at a time. Every caller that asks for
/// the key while that loader runs receives its outcome, success or failure.
/// Successful values are kept until [`flush`](Self::flush); failures are never
/// stored, so the next request retries.
///
/// Loaders run as their own tokio tasks. A caller that stops waiting does not
/// cancel the load; only `flush` (or dropping the cache) does.
///
/// # Example
///
/// ```ignore
/// let cache: KeyedCache<String, Vec<Stream>> = KeyedCache::new("streams");
/// let streams = cache
///     .get("item-1".to_string(), || async { provider.get_streams(&id).await })
///     .await?;
/// ```
pub struct KeyedCache<K, T> {
    inner: Arc<CacheInner<K, T>>,
}

impl<K, T> KeyedCache<K, T>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache. `name` tags its log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                name,
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    in_flight: HashMap::new(),
                }),
                counters: CacheCounters::default(),
                next_load_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Returns the stored value for `key`, joins its in-flight load, or starts
    /// `loader` on a new task.
    ///
    /// `loader` is invoked at most once, and only on a miss. It is called while
    /// the cache's bookkeeping lock is held, so it must only build the future
    /// and never touch this cache synchronously.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn get<F, Fut>(&self, key: K, loader: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        match self.lookup(key, loader) {
            Lookup::Hit(value) => Ok(value),
            Lookup::Wait(load) => load.await,
        }
    }

    fn lookup<F, Fut>(&self, key: K, loader: F) -> Lookup<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let name = self.inner.name;
        let mut state = self.inner.state.lock();

        if let Some(entry) = state.entries.get(&key) {
            self.inner.counters.record_hit();
            trace!(cache = name, key = %key, "Cache hit");
            return Lookup::Hit(entry.value.clone());
        }

        if let Some(flight) = state.in_flight.get(&key) {
            self.inner.counters.record_coalesced();
            debug!(cache = name, key = %key, "Joining in-flight load");
            return Lookup::Wait(flight.load.clone());
        }

        self.inner.counters.record_miss();
        debug!(cache = name, key = %key, "Cache miss, starting loader");

        let load_id = self.inner.next_load_id.fetch_add(1, Ordering::Relaxed);
        let pending = loader();

        let settle_to = Arc::clone(&self.inner);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let result = pending.await;
            settle_to.settle(&task_key, load_id, &result);
            result
        });
        let abort = task.abort_handle();

        let release_to: Weak<CacheInner<K, T>> = Arc::downgrade(&self.inner);
        let wait_key = key.clone();
        let load = async move {
            match task.await {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => Err(MetadataError::Cancelled(format!(
                    "{} load for {} was cancelled",
                    name, wait_key
                ))),
                Err(err) => {
                    if let Some(inner) = release_to.upgrade() {
                        inner.counters.record_failure();
                        inner.release(&wait_key, load_id);
                    }
                    warn!(cache = name, key = %wait_key, error = %err, "Loader panicked");
                    Err(MetadataError::LoaderPanicked(format!(
                        "{} load for {}: {}",
                        name, wait_key, err
                    )))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            key,
            InFlight {
                id: load_id,
                load: load.clone(),
                abort,
            },
        );

        Lookup::Wait(load)
    }

    /// Drops every stored entry and cancels every in-flight load.
    ///
    /// Callers waiting on a cancelled load receive [`MetadataError::Cancelled`].
    pub fn flush(&self) -> FlushOutcome {
        let (entries, in_flight) = {
            let mut state = self.inner.state.lock();
            (
                std::mem::take(&mut state.entries),
                std::mem::take(&mut state.in_flight),
            )
        };

        for flight in in_flight.values() {
            flight.abort.abort();
        }

        let outcome = FlushOutcome {
            entries_cleared: entries.len(),
            loads_cancelled: in_flight.len(),
        };
        debug!(
            cache = self.inner.name,
            entries_cleared = outcome.entries_cleared,
            loads_cancelled = outcome.loads_cancelled,
            "Cache flushed"
        );
        outcome
    }

    /// Stored value for `key`, without loading.
    pub fn peek(&self, key: &K) -> Option<T> {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
    }

    pub fn entry(&self, key: &K) -> Option<CacheEntry<T>> {
        self.inner.state.lock().entries.get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.state.lock().entries.contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }
}

impl<K, T> Drop for KeyedCache<K, T> {
    fn drop(&mut self) {
        for flight in self.inner.state.lock().in_flight.values() {
            flight.abort.abort();
        }
    }
}

impl<K, T> fmt::Debug for KeyedCache<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("KeyedCache")
            .field("name", &self.inner.name)
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<String>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value.to_string())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_stored_entry_skips_loader() {
        let cache: KeyedCache<String, String> = KeyedCache::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get("a".to_string(), counting_loader(&calls, "one"))
            .await
            .unwrap();
        let second = cache
            .get("a".to_string(), counting_loader(&calls, "two"))
            .await
            .unwrap();

        assert_eq!(first, "one");
        assert_eq!(second, "one");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&"a".to_string()), Some("one".to_string()));
        assert!(cache.entry(&"a".to_string()).is_some());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_stored() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new("test");

        let err = cache
            .get("k", || async { Err(MetadataError::Provider("503".to_string())) })
            .await
            .unwrap_err();
        assert_eq!(err, MetadataError::Provider("503".to_string()));
        assert!(!cache.contains(&"k"));
        assert_eq!(cache.in_flight_count(), 0);

        let value = cache.get("k", || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(cache.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_waiters_share_one_load() {
        let cache: Arc<KeyedCache<&'static str, u32>> = Arc::new(KeyedCache::new("test"));
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok(42)
                    })
                    .await
            })
        };

        while cache.in_flight_count() == 0 {
            tokio::task::yield_now().await;
        }

        let second = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get("k", || async { Ok(0) }).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.notify_one();

        assert_eq!(first.await.unwrap().unwrap(), 42);
        assert_eq!(second.await.unwrap().unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().coalesced, 1);
    }

    #[tokio::test]
    async fn test_flush_cancels_waiters() {
        let cache: Arc<KeyedCache<&'static str, u32>> = Arc::new(KeyedCache::new("test"));

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get("k", || async {
                        futures::future::pending::<()>().await;
                        Ok(1)
                    })
                    .await
            })
        };

        while cache.in_flight_count() == 0 {
            tokio::task::yield_now().await;
        }

        let outcome = cache.flush();
        assert_eq!(outcome.loads_cancelled, 1);
        assert_eq!(cache.in_flight_count(), 0);

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, MetadataError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_flush_clears_entries() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new("test");
        cache.get("a", || async { Ok(1) }).await.unwrap();
        cache.get("b", || async { Ok(2) }).await.unwrap();
        assert_eq!(cache.len(), 2);

        let outcome = cache.flush();
        assert_eq!(
            outcome,
            FlushOutcome {
                entries_cleared: 2,
                loads_cancelled: 0
            }
        );
        assert!(cache.is_empty());

        let reloaded = cache.get("a", || async { Ok(10) }).await.unwrap();
        assert_eq!(reloaded, 10);
    }

    fn exploding_load() -> Result<u32> {
        panic!("loader bug")
    }

    #[tokio::test]
    async fn test_panicking_loader_releases_lock() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new("test");

        let err = cache
            .get("k", || async { exploding_load() })
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::LoaderPanicked(_)));
        assert_eq!(cache.in_flight_count(), 0);

        let value = cache.get("k", || async { Ok(3) }).await.unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_cancel_load() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new("test");

        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            cache.get("k", || async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(9)
            }),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.peek(&"k"), Some(9));
    }
}
