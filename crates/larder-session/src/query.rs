//! Keyed cache of asynchronous fetch results.
//!
//! Every dashboard data source (inventory, resources, chat history,
//! analytics) reads through this cache. It deduplicates concurrent identical
//! requests, serves cached data within a staleness window, retries failed
//! fetches up to a bound, and evicts entries no view has observed recently.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::clock::{SharedClock, SystemClock};
use crate::config::CacheConfig;
use crate::key::QueryKey;

/// Lifecycle state of a cache entry.
///
/// The three non-idle states are mutually exclusive: views render exactly one
/// of loading, error, or data for any key at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No fetch has been attempted yet.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch succeeded.
    Success,
    /// The last fetch failed and the retry budget is exhausted.
    Error,
}

/// Per-call query options. Unset fields fall back to the cache defaults,
/// preserving per-domain tuning of staleness windows at each call site.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// When false, no fetch is attempted regardless of staleness.
    pub disabled: bool,
    /// Staleness window override.
    pub stale_time: Option<Duration>,
    /// Retry budget override (additional attempts after the first).
    pub retry: Option<u32>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the query (enabled by default).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.disabled = !enabled;
        self
    }

    /// Override the staleness window for this call site.
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Override the retry budget for this call site.
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// Observable state of a cache entry, returned to views.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    /// Last successfully fetched payload. Preserved across failed refetches
    /// so views can keep rendering stale data next to the error.
    pub data: Option<T>,
    /// Entry status.
    pub status: QueryStatus,
    /// Message from the last failed fetch. Populated exactly when `status`
    /// is [`QueryStatus::Error`].
    pub error: Option<String>,
    /// Attempts made for the most recent fetch.
    pub attempts: u32,
}

impl<T> Default for QuerySnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            attempts: 0,
        }
    }
}

impl<T> QuerySnapshot<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

/// In-flight fetch marker stored in an entry.
struct Inflight {
    /// Wakeup channel for deduplicated callers.
    rx: watch::Receiver<()>,
    /// Identity of the owning fetch, so only the owner clears the marker.
    id: u64,
}

/// Entry stored in the cache, one per unique query key.
struct Entry<T> {
    data: Option<T>,
    status: QueryStatus,
    error: Option<String>,
    /// When the data was last successfully fetched.
    fetched_at: Option<Instant>,
    /// Attempts made for the current in-flight fetch.
    attempts: u32,
    /// Bumped by invalidation; completions from an older generation are
    /// discarded instead of overwriting newer state.
    generation: u64,
    /// Set by invalidation: forces a refetch on the next read.
    stale: bool,
    inflight: Option<Inflight>,
    /// Last time any caller observed this entry (drives GC).
    last_observed: Instant,
}

impl<T: Clone> Entry<T> {
    fn new(now: Instant) -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
            attempts: 0,
            generation: 0,
            stale: false,
            inflight: None,
            last_observed: now,
        }
    }

    /// Whether a fetch should be triggered for this entry.
    ///
    /// Exhausted-error entries do not refetch until invalidated.
    fn needs_fetch(&self, now: Instant, stale_time: Duration) -> bool {
        if self.stale {
            return true;
        }
        match self.status {
            QueryStatus::Idle => true,
            QueryStatus::Loading | QueryStatus::Error => false,
            QueryStatus::Success => match self.fetched_at {
                Some(fetched_at) => now.duration_since(fetched_at) > stale_time,
                None => true,
            },
        }
    }

    fn snapshot(&self) -> QuerySnapshot<T> {
        QuerySnapshot {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            attempts: self.attempts,
        }
    }
}

/// Shared cache state.
struct Shared<T> {
    entries: RwLock<LruCache<QueryKey, Entry<T>>>,
    /// Monotonic id source for in-flight fetches.
    next_fetch_id: AtomicU64,
}

/// Keyed cache of asynchronous fetch results with deduplication, staleness,
/// bounded retry, and inactivity-based garbage collection.
///
/// One cache instance holds one payload type; cloning shares the underlying
/// entries. All waiting happens outside the lock: critical sections never
/// hold the lock across an await point.
pub struct QueryCache<T> {
    shared: Arc<Shared<T>>,
    config: CacheConfig,
    clock: SharedClock,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
    /// Create a cache using the wall clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an injected time source (deterministic staleness
    /// and GC windows under test).
    pub fn with_clock(config: CacheConfig, clock: SharedClock) -> Self {
        let cap =
            NonZeroUsize::new(config.max_entries).unwrap_or_else(|| NonZeroUsize::new(1).unwrap());

        Self {
            shared: Arc::new(Shared {
                entries: RwLock::new(LruCache::new(cap)),
                next_fetch_id: AtomicU64::new(1),
            }),
            config,
            clock,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current number of cached entries.
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    /// Read the current state for a key, triggering a fetch when the entry is
    /// missing, stale, or invalidated (and the query is enabled).
    ///
    /// Concurrent calls with the same key attach to the in-flight fetch
    /// instead of issuing a second request. Failed fetches are retried up to
    /// the configured bound within this call; after that the entry stays in
    /// error state until [`invalidate`](Self::invalidate).
    pub async fn query<F, Fut, E>(
        &self,
        key: impl Into<QueryKey>,
        options: QueryOptions,
        fetch: F,
    ) -> QuerySnapshot<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        enum Action<T> {
            Done(QuerySnapshot<T>),
            Wait(watch::Receiver<()>),
            Fetch {
                id: u64,
                generation: u64,
                prev_status: QueryStatus,
                tx: watch::Sender<()>,
            },
        }

        let key = key.into();
        let stale_time = options.stale_time.unwrap_or(self.config.stale_time);
        let retry = options.retry.unwrap_or(self.config.retry);

        loop {
            let action = {
                let mut entries = self.shared.entries.write();
                let now = self.clock.now();

                if options.disabled {
                    // Disabled queries never fetch and never create entries.
                    let snapshot = entries
                        .peek(&key)
                        .map(Entry::snapshot)
                        .unwrap_or_default();
                    Action::Done(snapshot)
                } else {
                    // A full cache evicts a settled entry, never one with a
                    // fetch in flight (mirrors collect_garbage). With every
                    // entry in flight the LRU one is sacrificed; its fetcher
                    // lands in the evicted-entry path of run_fetch.
                    if !entries.contains(&key) && entries.len() == entries.cap().get() {
                        let victim = entries
                            .iter()
                            .rev()
                            .find(|(_, entry)| entry.inflight.is_none())
                            .map(|(victim, _)| victim.clone());
                        if let Some(victim) = victim {
                            entries.pop(&victim);
                        }
                    }

                    let entry = entries.get_or_insert_mut(key.clone(), || Entry::new(now));
                    entry.last_observed = now;

                    if let Some(inflight) = &entry.inflight {
                        Action::Wait(inflight.rx.clone())
                    } else if entry.needs_fetch(now, stale_time) {
                        let id = self.shared.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                        let (tx, rx) = watch::channel(());
                        let prev_status = entry.status;
                        entry.status = QueryStatus::Loading;
                        entry.attempts = 0;
                        entry.stale = false;
                        entry.inflight = Some(Inflight { rx, id });
                        Action::Fetch {
                            id,
                            generation: entry.generation,
                            prev_status,
                            tx,
                        }
                    } else {
                        Action::Done(entry.snapshot())
                    }
                }
            };

            match action {
                Action::Done(snapshot) => return snapshot,
                Action::Wait(mut rx) => {
                    trace!(key = %key, "Attaching to in-flight fetch");
                    // Wakes when the fetcher drops its sender; re-examine.
                    let _ = rx.changed().await;
                }
                Action::Fetch {
                    id,
                    generation,
                    prev_status,
                    tx,
                } => {
                    return self
                        .run_fetch(&key, id, generation, prev_status, tx, retry, &fetch)
                        .await;
                }
            }
        }
    }

    /// Execute the fetch (with retries) and apply the outcome.
    async fn run_fetch<F, Fut, E>(
        &self,
        key: &QueryKey,
        id: u64,
        generation: u64,
        prev_status: QueryStatus,
        tx: watch::Sender<()>,
        retry: u32,
        fetch: &F,
    ) -> QuerySnapshot<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        // Restores the entry if this future is dropped mid-fetch, so an
        // abandoned caller never strands waiters or leaves a phantom
        // in-flight marker. The sender is dropped with the guard, waking
        // deduplicated callers on every exit path.
        let mut guard = FetchGuard {
            shared: Arc::clone(&self.shared),
            key: key.clone(),
            id,
            prev_status,
            armed: true,
            _tx: tx,
        };

        let mut value = None;
        let mut last_error = None;

        for attempt in 0..=retry {
            {
                let mut entries = self.shared.entries.write();
                if let Some(entry) = entries.peek_mut(key) {
                    if entry.generation == generation {
                        entry.attempts = attempt + 1;
                    }
                }
            }

            match fetch().await {
                Ok(v) => {
                    value = Some(v);
                    break;
                }
                Err(e) => {
                    let message = e.to_string();
                    debug!(key = %key, attempt = attempt + 1, error = %message, "Query fetch failed");
                    last_error = Some(message);
                }
            }
        }

        let snapshot = {
            let mut entries = self.shared.entries.write();
            let now = self.clock.now();
            guard.armed = false;

            match entries.peek_mut(key) {
                Some(entry) => {
                    let owns = entry.inflight.as_ref().is_some_and(|i| i.id == id);
                    if owns {
                        entry.inflight = None;
                    }

                    if entry.generation == generation {
                        match value {
                            Some(v) => {
                                trace!(key = %key, "Query fetch succeeded");
                                entry.data = Some(v);
                                entry.status = QueryStatus::Success;
                                entry.error = None;
                                entry.fetched_at = Some(now);
                            }
                            None => {
                                entry.status = QueryStatus::Error;
                                entry.error = last_error;
                            }
                        }
                    } else if owns && entry.status == QueryStatus::Loading {
                        // Invalidated while in flight: discard the completion
                        // and let the next reader start a fresh fetch.
                        trace!(key = %key, "Discarding completion from an older generation");
                        entry.status = prev_status;
                    }

                    entry.snapshot()
                }
                // Entry was evicted while the fetch was in flight.
                None => QuerySnapshot::default(),
            }
        };

        snapshot
    }

    /// Read the current state for a key without observing it or fetching.
    pub fn peek(&self, key: &QueryKey) -> Option<QuerySnapshot<T>> {
        self.shared.entries.read().peek(key).map(Entry::snapshot)
    }

    /// Mark an entry stale, forcing the next read to refetch.
    ///
    /// Cached data is retained for display until the refetch completes. A
    /// fetch already in flight is orphaned: its completion is discarded.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.shared.entries.write();
        if let Some(entry) = entries.peek_mut(key) {
            entry.generation += 1;
            entry.stale = true;
            entry.attempts = 0;
            debug!(key = %key, "Query invalidated");
        }
    }

    /// Run a one-shot mutation not tied to a persistent key.
    ///
    /// On success the given dependent query keys are invalidated so the next
    /// read reflects the server-side change.
    pub async fn mutate<Fut, R, E>(
        &self,
        invalidates: &[QueryKey],
        op: Fut,
    ) -> Result<R, E>
    where
        Fut: Future<Output = Result<R, E>>,
    {
        let result = op.await;

        if result.is_ok() {
            for key in invalidates {
                self.invalidate(key);
            }
        }

        result
    }

    /// Remove an entry outright.
    pub fn remove(&self, key: &QueryKey) {
        let mut entries = self.shared.entries.write();
        if entries.pop(key).is_some() {
            debug!(key = %key, "Query entry removed");
        }
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.shared.entries.write().clear();
    }

    /// Evict entries no caller has observed within the GC window.
    ///
    /// In-flight entries are never collected. Returns the number evicted.
    pub fn collect_garbage(&self) -> usize {
        let mut entries = self.shared.entries.write();
        let now = self.clock.now();

        let expired: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, entry)| {
                entry.inflight.is_none()
                    && now.duration_since(entry.last_observed) > self.config.gc_time
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
            debug!(key = %key, "Collected unobserved query entry");
        }

        expired.len()
    }

    /// Spawn a background task running [`collect_garbage`](Self::collect_garbage)
    /// on the configured interval.
    pub fn spawn_gc_task(&self) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cache.config.gc_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let collected = cache.collect_garbage();
                if collected > 0 {
                    debug!(collected, "Query cache GC pass");
                }
            }
        })
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.shared.entries.read();
        CacheStats {
            size: entries.len(),
            capacity: self.config.max_entries,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Current number of cached entries.
    pub size: usize,
    /// Maximum capacity.
    pub capacity: usize,
}

/// Drop guard held by the fetching caller for the duration of a fetch.
struct FetchGuard<T> {
    shared: Arc<Shared<T>>,
    key: QueryKey,
    id: u64,
    prev_status: QueryStatus,
    armed: bool,
    _tx: watch::Sender<()>,
}

impl<T> Drop for FetchGuard<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        // Caller future dropped mid-fetch. Clear the in-flight marker and
        // restore the prior status; waiters wake when the sender drops.
        let mut entries = self.shared.entries.write();
        if let Some(entry) = entries.peek_mut(&self.key) {
            if entry.inflight.as_ref().is_some_and(|i| i.id == self.id) {
                entry.inflight = None;
                if entry.status == QueryStatus::Loading {
                    entry.status = self.prev_status;
                }
            }
        }
    }
}
