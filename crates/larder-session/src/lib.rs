//! Session state and query cache for the Larder dashboard client.
//!
//! Two cooperating pieces form the client core:
//!
//! - [`SessionStore`] owns the authenticated user's profile, authentication
//!   flag, and the lifecycle around the persisted credential token. Every
//!   view reads session state from it.
//! - [`QueryCache`] is a generic keyed cache of asynchronous fetch results
//!   with staleness windows, bounded retry, in-flight deduplication, and
//!   inactivity-based garbage collection.
//!
//! A view asks the session store whether the user is authenticated, then
//! issues keyed queries through the cache; mutations invalidate the affected
//! keys so the next read refetches.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use larder_session::{CacheConfig, QueryCache, QueryKey, QueryOptions, SessionStore};
//!
//! let session = SessionStore::initialize(client.clone(), credentials).await;
//!
//! let inventory: QueryCache<Vec<InventoryItem>> = QueryCache::new(CacheConfig::default());
//! let snapshot = inventory
//!     .query(
//!         QueryKey::from(["inventory", "produce"]),
//!         QueryOptions::new().enabled(session.is_authenticated()),
//!         || async { client.inventory().list(&query).await },
//!     )
//!     .await;
//! ```

mod clock;
mod config;
mod key;
mod query;
mod session;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{
    CacheConfig, DEFAULT_GC_TIME, DEFAULT_MAX_ENTRIES, DEFAULT_RETRY, DEFAULT_STALE_TIME,
};
pub use key::QueryKey;
pub use query::{CacheStats, QueryCache, QueryOptions, QuerySnapshot, QueryStatus};
pub use session::{ProfileSource, SessionState, SessionStore};
