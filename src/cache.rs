//! Full-path resolution caching.
//!
//! [`RouteCache`] is an LRU map from a route path to the chain of concrete
//! route parts it resolves to, so repeated navigations to the same path skip
//! the backtracking search in [`RouteGraph`](crate::RouteGraph). Misses are
//! cached too (`None`), because the graph is frozen once built and a path
//! that did not resolve will never resolve.
//!
//! The cache is gated behind the `cache` feature and uses the [`lru`] crate.
//! [`CacheStats`] tracks hits and misses. Entries are never invalidated.
//!
//! # Examples
//!
//! ```
//! use view_navigator::cache::RouteCache;
//!
//! let mut cache = RouteCache::with_capacity(16);
//! assert!(cache.get("/home").is_none());
//! cache.insert("/home".to_string(), None);
//!
//! assert_eq!(cache.get("/home"), Some(None));
//! assert_eq!(cache.stats().hits, 1);
//! assert_eq!(cache.stats().misses, 1);
//! ```

use crate::route::ConcreteRoutePart;
use crate::trace_log;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Counters tracking cache hit/miss rates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups answered from the cache.
    pub hits: usize,
    /// Number of lookups that had to run the matcher.
    pub misses: usize,
}

impl CacheStats {
    /// Return the hit rate as a value in `0.0..=1.0`.
    ///
    /// Returns `0.0` if no lookups have been performed.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Resolved chain for a path; `None` records a path that matched nothing.
pub type CachedResolution = Option<Vec<ConcreteRoutePart>>;

/// LRU cache of full-path resolution results.
#[derive(Debug)]
pub struct RouteCache {
    entries: LruCache<String, CachedResolution>,
    stats: CacheStats,
}

impl RouteCache {
    const DEFAULT_CAPACITY: usize = 256;

    /// Create a cache with the default capacity (256 paths).
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a cache holding at most `capacity` paths.
    ///
    /// A zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    /// Look up the cached resolution of `path`.
    ///
    /// The outer `None` is a cache miss; `Some(None)` is a cached "no route".
    pub fn get(&mut self, path: &str) -> Option<CachedResolution> {
        if let Some(entry) = self.entries.get(path) {
            self.stats.hits += 1;
            trace_log!("Resolution cache hit for path: '{}'", path);
            Some(entry.clone())
        } else {
            self.stats.misses += 1;
            trace_log!("Resolution cache miss for path: '{}'", path);
            None
        }
    }

    /// Record the resolution of `path`.
    pub fn insert(&mut self, path: String, resolution: CachedResolution) {
        trace_log!(
            "Caching resolution of '{}' ({})",
            path,
            resolution
                .as_ref()
                .map_or_else(|| "no route".to_string(), |chain| format!("{} parts", chain.len()))
        );
        self.entries.push(path, resolution);
    }

    /// Return a reference to the current cache statistics.
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached paths.
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new()
    }
}
