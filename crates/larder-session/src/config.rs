//! Configuration for the query cache.

use std::time::Duration;

/// Default maximum number of cached entries before LRU eviction.
pub const DEFAULT_MAX_ENTRIES: usize = 256;

/// Default staleness window. Call sites tune this per domain via
/// [`QueryOptions`](crate::QueryOptions); dashboards use anything from a
/// couple of minutes (inventory) to fifteen (static resources).
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Default number of additional attempts after a failed fetch.
pub const DEFAULT_RETRY: u32 = 2;

/// Default inactivity window after which an unobserved entry is collected.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

/// Configuration for the query cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries to cache before LRU eviction.
    pub max_entries: usize,

    /// Staleness window applied when a query does not override it.
    pub stale_time: Duration,

    /// Retry budget (additional attempts) applied when a query does not
    /// override it.
    pub retry: u32,

    /// Entries unobserved for longer than this are eligible for collection.
    pub gc_time: Duration,

    /// Interval for the background collection task (if spawned).
    pub gc_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            stale_time: DEFAULT_STALE_TIME,
            retry: DEFAULT_RETRY,
            gc_time: DEFAULT_GC_TIME,
            gc_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the default staleness window.
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Set the default retry budget.
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Set the inactivity window for garbage collection.
    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    /// Set the background collection interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }
}
