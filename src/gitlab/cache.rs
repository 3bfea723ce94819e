//! In-memory TTL + LRU cache for normalized views and diffs.
//!
//! Two independent spaces share the [`Fingerprint`] key: one holds
//! [`NormalizedView`]s, the other the REST diff listing. Each space has its
//! own capacity bound and time-to-live. Expiry is lazy: an entry older than
//! its TTL is treated as absent on the next read and removed then.
//!
//! Reads and writes are synchronous and never perform I/O. A read followed
//! by a write is not atomic, so concurrent callers can both miss and both
//! write; the last write wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use super::clock::{Clock, system_clock};
use super::locator::Fingerprint;
use super::models::{FileDiff, NormalizedView};

/// Default number of entries per cache space.
pub const DEFAULT_CAPACITY: usize = 100;
/// Default time-to-live for normalized views.
pub const DEFAULT_VIEW_TTL: Duration = Duration::from_secs(30);
/// Default time-to-live for diff listings.
pub const DEFAULT_DIFF_TTL: Duration = Duration::from_secs(120);

/// Time-to-live for each cache space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// TTL of the view space.
    pub view: Duration,
    /// TTL of the diff space.
    pub diffs: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            view: DEFAULT_VIEW_TTL,
            diffs: DEFAULT_DIFF_TTL,
        }
    }
}

/// Number of live entries in each space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Entries in the view space.
    pub main_size: usize,
    /// Entries in the diff space.
    pub diff_size: usize,
}

#[derive(Debug)]
struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
    ttl: Duration,
    last_used: u64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) > self.ttl
    }
}

/// One bounded, expiring key space.
#[derive(Debug)]
struct Space<T> {
    name: &'static str,
    entries: HashMap<Fingerprint, CacheEntry<T>>,
    capacity: usize,
    ttl: Duration,
    tick: u64,
}

impl<T: Clone> Space<T> {
    fn new(name: &'static str, capacity: usize, ttl: Duration) -> Self {
        Self {
            name,
            entries: HashMap::new(),
            capacity: capacity.max(1),
            ttl,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick = self.tick.wrapping_add(1);
        self.tick
    }

    fn get(&mut self, key: &Fingerprint, now: Instant) -> Option<T> {
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.entries.remove(key);
            tracing::trace!(space = self.name, key = %key, "cache entry expired");
            return None;
        }
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.value.clone())
    }

    fn set(&mut self, key: Fingerprint, value: T, now: Instant) {
        let tick = self.next_tick();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                ttl: self.ttl,
                last_used: tick,
            },
        );
        while self.entries.len() > self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(space = self.name, key = %oldest, "evicted least recently used entry");
        }
    }

    fn remove(&mut self, key: &Fingerprint) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn live_len(&mut self, now: Instant) -> usize {
        self.entries.retain(|_, entry| !entry.is_expired(now));
        self.entries.len()
    }

    fn live_count(&self, now: Instant) -> usize {
        self.entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }
}

/// Cache in front of the normalized view and diff fetches.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mergelens::gitlab::cache::ViewCache;
/// use mergelens::gitlab::clock::system_clock;
///
/// let cache = ViewCache::new(system_clock()).with_capacity(10);
/// assert_eq!(cache.stats().main_size, 0);
/// ```
pub struct ViewCache {
    clock: Arc<dyn Clock>,
    views: Mutex<Space<NormalizedView>>,
    diffs: Mutex<Space<Vec<FileDiff>>>,
}

impl ViewCache {
    /// Creates a cache with default capacity and TTLs.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let ttls = CacheTtls::default();
        Self {
            clock,
            views: Mutex::new(Space::new("view", DEFAULT_CAPACITY, ttls.view)),
            diffs: Mutex::new(Space::new("diffs", DEFAULT_CAPACITY, ttls.diffs)),
        }
    }

    /// Sets the per-space capacity (at least one entry). Drops existing
    /// entries.
    #[must_use]
    pub fn with_capacity(self, capacity: usize) -> Self {
        let ttls = self.ttls();
        Self {
            views: Mutex::new(Space::new("view", capacity, ttls.view)),
            diffs: Mutex::new(Space::new("diffs", capacity, ttls.diffs)),
            clock: self.clock,
        }
    }

    /// Sets the TTL of each space. Drops existing entries.
    #[must_use]
    pub fn with_ttls(self, ttls: CacheTtls) -> Self {
        let capacity = lock(&self.views).capacity;
        Self {
            views: Mutex::new(Space::new("view", capacity, ttls.view)),
            diffs: Mutex::new(Space::new("diffs", capacity, ttls.diffs)),
            clock: self.clock,
        }
    }

    /// Configured TTLs.
    #[must_use]
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            view: lock(&self.views).ttl,
            diffs: lock(&self.diffs).ttl,
        }
    }

    /// Returns the cached view, or `None` on a miss or an expired entry.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<NormalizedView> {
        let hit = lock(&self.views).get(fingerprint, self.clock.now());
        tracing::trace!(key = %fingerprint, hit = hit.is_some(), "view cache lookup");
        hit
    }

    /// Stores `view`, resetting its TTL and recency.
    pub fn set(&self, fingerprint: Fingerprint, view: NormalizedView) {
        lock(&self.views).set(fingerprint, view, self.clock.now());
    }

    /// Returns the cached diff listing, or `None` on a miss or expiry.
    #[must_use]
    pub fn get_diffs(&self, fingerprint: &Fingerprint) -> Option<Vec<FileDiff>> {
        let hit = lock(&self.diffs).get(fingerprint, self.clock.now());
        tracing::trace!(key = %fingerprint, hit = hit.is_some(), "diff cache lookup");
        hit
    }

    /// Stores a diff listing, resetting its TTL and recency.
    pub fn set_diffs(&self, fingerprint: Fingerprint, diffs: Vec<FileDiff>) {
        lock(&self.diffs).set(fingerprint, diffs, self.clock.now());
    }

    /// Removes the fingerprint from both spaces.
    pub fn invalidate(&self, fingerprint: &Fingerprint) {
        lock(&self.views).remove(fingerprint);
        lock(&self.diffs).remove(fingerprint);
        tracing::debug!(key = %fingerprint, "cache entry invalidated");
    }

    /// Empties both spaces.
    pub fn clear(&self) {
        lock(&self.views).clear();
        lock(&self.diffs).clear();
        tracing::debug!("cache cleared");
    }

    /// Counts live entries in each space, dropping expired ones.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        CacheStats {
            main_size: lock(&self.views).live_len(now),
            diff_size: lock(&self.diffs).live_len(now),
        }
    }

    /// Like [`stats`](Self::stats) but leaves expired entries in place.
    fn peek_stats(&self) -> CacheStats {
        let now = self.clock.now();
        CacheStats {
            main_size: lock(&self.views).live_count(now),
            diff_size: lock(&self.diffs).live_count(now),
        }
    }
}

impl std::fmt::Debug for ViewCache {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ViewCache")
            .field("stats", &self.peek_stats())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide cache, created with defaults on first use.
///
/// Production wiring may pass this instance to
/// [`MergeRequestViews`](super::views::MergeRequestViews); tests construct
/// their own [`ViewCache`].
#[must_use]
pub fn shared_cache() -> Arc<ViewCache> {
    static SHARED: OnceLock<Arc<ViewCache>> = OnceLock::new();
    Arc::clone(SHARED.get_or_init(|| Arc::new(ViewCache::new(system_clock()))))
}
