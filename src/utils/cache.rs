//! Request Cache Module
//!
//! Keyed cache in front of the chain client. Uses DashMap so unrelated
//! keys never contend on a global lock.
//!
//! Features:
//! - In-flight dedup: at most one fetch per key, extra callers join it
//! - Two windows per entry: fresh (< stale_after), stale (< evict_after)
//! - Stale hits return immediately and start one background refresh
//! - Errors fan out to every waiter and are never cached
//! - Every fetch carries a ticket; `invalidate` drops the slot so a late
//!   result for an old ticket is discarded
//!
//! Fetches run in spawned tasks, so a caller that drops its future only
//! detaches itself; other waiters and the network call are unaffected.

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::config::CacheConfig;
use crate::models::errors::{ChainError, ChainResult};
use crate::models::query::QueryKey;

/// Future producing a value for one key
pub type FetchFuture<V> = BoxFuture<'static, ChainResult<V>>;

type SharedFetch<V> = Shared<BoxFuture<'static, ChainResult<V>>>;

/// Observable state of a cached key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryState {
    Fresh,
    Stale,
    Refreshing,
}

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
    state: EntryState,
}

struct InFlight<V> {
    ticket: u64,
    result: SharedFetch<V>,
}

/// Everything the cache knows about one key
struct Slot<V> {
    entry: Option<CacheEntry<V>>,
    /// Synchronous fetch or background refresh, never both
    in_flight: Option<InFlight<V>>,
}

impl<V> Slot<V> {
    fn empty() -> Self {
        Self {
            entry: None,
            in_flight: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.entry.is_none() && self.in_flight.is_none()
    }
}

struct CacheInner<V> {
    slots: DashMap<QueryKey, Slot<V>>,
    stale_after: Duration,
    evict_after: Duration,
    next_ticket: AtomicU64,
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    refreshes: AtomicU64,
}

impl<V: Clone> CacheInner<V> {
    /// Apply a finished fetch. Ignored unless `ticket` is still current.
    fn complete(&self, key: &QueryKey, ticket: u64, result: &ChainResult<V>) {
        let remove = {
            let Some(mut slot) = self.slots.get_mut(key) else {
                debug!("🗑️ CACHE DISCARD (invalidated): {}", key);
                return;
            };
            if slot.in_flight.as_ref().map(|f| f.ticket) != Some(ticket) {
                debug!("🗑️ CACHE DISCARD (superseded): {}", key);
                return;
            }
            slot.in_flight = None;

            match result {
                Ok(value) => {
                    slot.entry = Some(CacheEntry {
                        value: value.clone(),
                        fetched_at: Instant::now(),
                        state: EntryState::Fresh,
                    });
                    debug!("💾 CACHE SET: {}", key);
                }
                Err(e) => {
                    // A failed refresh leaves the old value servable as stale
                    if let Some(entry) = slot.entry.as_mut() {
                        entry.state = EntryState::Stale;
                    }
                    warn!("⚠️ CACHE FETCH FAILED: {} ({})", key, e);
                }
            }
            slot.is_empty()
        };

        if remove {
            self.slots.remove_if(key, |_, slot| slot.is_empty());
        }
    }
}

impl<V> CacheInner<V> {
    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let evict_after = self.evict_after;
        let mut purged = 0;

        self.slots.retain(|_, slot| {
            let expired = slot
                .entry
                .as_ref()
                .map(|e| now.saturating_duration_since(e.fetched_at) >= evict_after)
                .unwrap_or(false);
            if expired {
                slot.entry = None;
                purged += 1;
            }
            !slot.is_empty()
        });

        if purged > 0 {
            info!("🧹 CACHE CLEANUP: {} expired entries removed", purged);
        }
        purged
    }
}

enum Lookup<V> {
    Ready(V),
    Wait(SharedFetch<V>),
}

/// Sender half of a registered fetch
struct Launch<V> {
    ticket: u64,
    tx: oneshot::Sender<ChainResult<V>>,
}

/// Deduplicating two-window cache for chain reads
pub struct RequestCache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for RequestCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for RequestCache<V> {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl<V: Clone + Send + Sync + 'static> RequestCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                slots: DashMap::new(),
                stale_after: config.stale_after,
                evict_after: config.evict_after,
                next_ticket: AtomicU64::new(1),
                hits: AtomicU64::new(0),
                stale_hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                joined: AtomicU64::new(0),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    /// Return the value for `key`, calling `fetch` only when no usable entry
    /// and no in-flight request exist (or to start a background refresh).
    ///
    /// `fetch` runs after the key's slot is unlocked, so it may read this cache.
    pub async fn get<F>(&self, key: &QueryKey, fetch: F) -> ChainResult<V>
    where
        F: FnOnce() -> FetchFuture<V>,
    {
        let now = Instant::now();

        let (lookup, launch) = {
            let mut guard = self.inner.slots.entry(key.clone()).or_insert_with(Slot::empty);
            let Slot { entry, in_flight } = &mut *guard;

            if let Some(cached) = entry.as_mut() {
                let age = now.saturating_duration_since(cached.fetched_at);

                if age < self.inner.stale_after {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("✅ CACHE HIT: {} (age {}s)", key, age.as_secs());
                    return Ok(cached.value.clone());
                }

                if age < self.inner.evict_after {
                    self.inner.stale_hits.fetch_add(1, Ordering::Relaxed);
                    let value = cached.value.clone();
                    let launch = if in_flight.is_none() {
                        let (pending, launch) = self.register(key);
                        cached.state = EntryState::Refreshing;
                        *in_flight = Some(pending);
                        self.inner.refreshes.fetch_add(1, Ordering::Relaxed);
                        info!("🔄 CACHE STALE: {} (age {}s), refreshing", key, age.as_secs());
                        Some(launch)
                    } else {
                        debug!("🔄 CACHE STALE: {} (refresh already running)", key);
                        None
                    };
                    (Lookup::Ready(value), launch)
                } else {
                    debug!("📭 CACHE EVICT: {} (age {}s)", key, age.as_secs());
                    *entry = None;
                    self.waiter(key, in_flight)
                }
            } else {
                self.waiter(key, in_flight)
            }
        };

        if let Some(launch) = launch {
            self.launch(key.clone(), launch, fetch());
        }

        match lookup {
            Lookup::Ready(value) => Ok(value),
            Lookup::Wait(waiter) => waiter.await,
        }
    }

    /// Join the running request for a key, or register a new one
    fn waiter(&self, key: &QueryKey, in_flight: &mut Option<InFlight<V>>) -> (Lookup<V>, Option<Launch<V>>) {
        match in_flight {
            Some(pending) => {
                self.inner.joined.fetch_add(1, Ordering::Relaxed);
                debug!("🔗 CACHE JOIN: {}", key);
                (Lookup::Wait(pending.result.clone()), None)
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS: {}", key);
                let (pending, launch) = self.register(key);
                let waiter = pending.result.clone();
                *in_flight = Some(pending);
                (Lookup::Wait(waiter), Some(launch))
            }
        }
    }

    /// New ticket plus a joinable result, fed later by `launch`
    fn register(&self, key: &QueryKey) -> (InFlight<V>, Launch<V>) {
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel::<ChainResult<V>>();

        let inner = Arc::downgrade(&self.inner);
        let key = key.clone();
        let result = async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => {
                    let err = ChainError::task_failed(format!("fetch for {} aborted", key));
                    if let Some(inner) = inner.upgrade() {
                        inner.complete(&key, ticket, &Err(err.clone()));
                    }
                    Err(err)
                }
            }
        }
        .boxed()
        .shared();

        (InFlight { ticket, result }, Launch { ticket, tx })
    }

    /// Drive `fut` in its own task; the slot is updated before waiters wake
    fn launch(&self, key: QueryKey, launch: Launch<V>, fut: FetchFuture<V>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = fut.await;
            inner.complete(&key, launch.ticket, &result);
            let _ = launch.tx.send(result);
        });
    }

    /// Purge expired entries every `period` until the last handle is dropped
    pub fn spawn_cleanup(&self, period: Duration) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        let period = period.max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.purge_expired();
            }
            debug!("🧹 cache cleanup stopped");
        })
    }

    /// Force-evict a key; the next `get` always fetches
    pub fn invalidate(&self, key: &QueryKey) {
        if self.inner.slots.remove(key).is_some() {
            info!("🗑️ CACHE INVALIDATE: {}", key);
        }
    }

    /// Invalidate every key matching `pred`; returns how many were dropped
    pub fn invalidate_where<P>(&self, pred: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let before = self.inner.slots.len();
        self.inner.slots.retain(|key, _| !pred(key));
        let removed = before.saturating_sub(self.inner.slots.len());
        if removed > 0 {
            info!("🗑️ CACHE INVALIDATE: {} keys", removed);
        }
        removed
    }

    /// Current state of a key, if it has a servable entry
    pub fn peek_state(&self, key: &QueryKey) -> Option<EntryState> {
        let slot = self.inner.slots.get(key)?;
        let entry = slot.entry.as_ref()?;
        let age = Instant::now().saturating_duration_since(entry.fetched_at);

        if age >= self.inner.evict_after {
            None
        } else if entry.state == EntryState::Refreshing {
            Some(EntryState::Refreshing)
        } else if age >= self.inner.stale_after {
            Some(EntryState::Stale)
        } else {
            Some(EntryState::Fresh)
        }
    }

    /// Cached value without touching the network, even if stale
    pub fn peek(&self, key: &QueryKey) -> Option<V> {
        let slot = self.inner.slots.get(key)?;
        let entry = slot.entry.as_ref()?;
        let age = Instant::now().saturating_duration_since(entry.fetched_at);
        (age < self.inner.evict_after).then(|| entry.value.clone())
    }

    /// Drop entries past `evict_after`. Keys with a request in flight stay.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    pub fn clear(&self) {
        self.inner.slots.clear();
        info!("🗑️ CACHE CLEARED");
    }

    pub fn stats(&self) -> CacheStats {
        let mut entries = 0;
        let mut in_flight = 0;
        for slot in self.inner.slots.iter() {
            if slot.entry.is_some() {
                entries += 1;
            }
            if slot.in_flight.is_some() {
                in_flight += 1;
            }
        }

        let hits = self.inner.hits.load(Ordering::Relaxed);
        let stale_hits = self.inner.stale_hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);
        let total = hits + stale_hits + misses;
        let hit_rate = if total > 0 {
            ((hits + stale_hits) as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries,
            in_flight,
            hits,
            stale_hits,
            misses,
            joined: self.inner.joined.load(Ordering::Relaxed),
            refreshes: self.inner.refreshes.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub in_flight: usize,
    pub hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    /// Callers that attached to an existing in-flight request
    pub joined: u64,
    pub refreshes: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::query::{ContractId, QueryArg};
    use alloy_primitives::U256;
    use futures_util::future::join_all;
    use std::sync::atomic::AtomicU32;

    fn key(n: u64) -> QueryKey {
        QueryKey::new(ContractId::LandNft, "getLandInfo", vec![QueryArg::Uint(U256::from(n))])
    }

    fn config() -> CacheConfig {
        CacheConfig {
            stale_after: Duration::from_secs(300),
            evict_after: Duration::from_secs(600),
            cleanup_interval: Duration::from_secs(60),
        }
    }

    /// Fetch that counts calls, waits 100ms and returns the call number
    fn counting(calls: &Arc<AtomicU32>) -> impl FnOnce() -> FetchFuture<u32> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(n)
            }
            .boxed()
        }
    }

    fn failing(calls: &Arc<AtomicU32>) -> impl FnOnce() -> FetchFuture<u32> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Err(ChainError::reverted("Land not ripe"))
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_gets_share_one_fetch() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        let results = join_all((0..10).map(|_| cache.get(&k, counting(&calls)))).await;

        assert!(results.iter().all(|r| *r.as_ref().unwrap() == 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.joined, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_served_without_fetch() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek_state(&k), Some(EntryState::Fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_triggers_single_refresh() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        cache.get(&k, counting(&calls)).await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;

        // Stale value comes back immediately, refresh runs in the background
        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 1);
        assert_eq!(cache.peek_state(&k), Some(EntryState::Refreshing));
        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 1);
        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 2);
        assert_eq!(cache.peek_state(&k), Some(EntryState::Fresh));
        assert_eq!(cache.stats().refreshes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_entry_refetched_synchronously() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        cache.get(&k, counting(&calls)).await.unwrap();
        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(cache.peek_state(&k), None);

        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_fetch() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        cache.get(&k, counting(&calls)).await.unwrap();
        cache.invalidate(&k);
        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_after_invalidate_is_discarded() {
        let cache = RequestCache::<u32>::new(&config());
        let k = key(1);

        let slow = {
            let cache = cache.clone();
            let k = k.clone();
            tokio::spawn(async move {
                cache
                    .get(&k, || {
                        async {
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            Ok(1)
                        }
                        .boxed()
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache.invalidate(&k);
        let fresh = cache.get(&k, || async { Ok(2) }.boxed()).await.unwrap();
        assert_eq!(fresh, 2);

        // The original waiter still gets its own result...
        assert_eq!(slow.await.unwrap().unwrap(), 1);
        // ...but it never overwrites the newer entry
        assert_eq!(cache.peek(&k), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_reaches_all_waiters_and_is_not_cached() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        let results = join_all((0..3).map(|_| cache.get(&k, failing(&calls)))).await;
        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().entries, 0);

        // Next call starts from scratch
        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_value() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        cache.get(&k, counting(&calls)).await.unwrap();
        tokio::time::advance(Duration::from_secs(400)).await;
        assert_eq!(cache.get(&k, failing(&calls)).await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.peek_state(&k), Some(EntryState::Stale));
        assert_eq!(cache.peek(&k), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiter_does_not_cancel_fetch() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let k = key(1);

        let detached = {
            let cache = cache.clone();
            let k = k.clone();
            let fetch = counting(&calls);
            tokio::spawn(async move { cache.get(&k, fetch).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        detached.abort();

        assert_eq!(cache.get(&k, counting(&calls)).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_and_clear() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));

        cache.get(&key(1), counting(&calls)).await.unwrap();
        tokio::time::advance(Duration::from_secs(601)).await;
        cache.get(&key(2), counting(&calls)).await.unwrap();

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.stats().entries, 1);

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_drops_expired_keys() {
        let cache = RequestCache::<u32>::new(&config());
        let calls = Arc::new(AtomicU32::new(0));
        let sweeper = cache.spawn_cleanup(Duration::from_secs(60));

        for n in 0..3 {
            cache.get(&key(n), counting(&calls)).await.unwrap();
        }
        assert_eq!(cache.stats().entries, 3);

        // Still servable as stale: kept
        tokio::time::sleep(Duration::from_secs(400)).await;
        assert_eq!(cache.stats().entries, 3);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(cache.stats().entries, 0);

        // Sweep ends with the last handle
        drop(cache);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(sweeper.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_refresh_after_invalidate_is_discarded() {
        let cache = RequestCache::<u32>::new(&config());
        let k = key(1);

        cache.get(&k, || async { Ok(1) }.boxed()).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;

        // Stale hit starts a slow background refresh
        let stale = cache
            .get(&k, || {
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(10)
                }
                .boxed()
            })
            .await
            .unwrap();
        assert_eq!(stale, 1);
        assert_eq!(cache.peek_state(&k), Some(EntryState::Refreshing));

        cache.invalidate(&k);
        assert_eq!(cache.get(&k, || async { Ok(2) }.boxed()).await.unwrap(), 2);

        // Let the abandoned refresh finish
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(cache.peek(&k), Some(2));
        assert_eq!(cache.peek_state(&k), Some(EntryState::Fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_may_read_the_cache() {
        let cache = RequestCache::<u32>::new(&config());
        let k = key(1);

        let inner = cache.clone();
        let same_key = k.clone();
        let seen = Arc::new(AtomicU32::new(0));
        let seen_in_fetch = Arc::clone(&seen);
        let value = cache
            .get(&k, move || {
                // Same key, same shard
                if inner.peek_state(&same_key).is_none() && inner.stats().in_flight == 1 {
                    seen_in_fetch.store(1, Ordering::SeqCst);
                }
                async { Ok(7) }.boxed()
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
