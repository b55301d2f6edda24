//! Navigator configuration.

use crate::error::{NavigationError, Result};

/// Limits for history and the view caches.
///
/// ```
/// use view_navigator::NavigatorConfig;
///
/// let config = NavigatorConfig::new()
///     .with_max_history_size(20)
///     .with_max_back_cache_depth(1);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorConfig {
    /// Maximum number of history entries; the oldest are dropped first.
    pub max_history_size: usize,
    /// Entries behind the departed one whose views stay materialized.
    pub max_back_cache_depth: usize,
    /// Entries ahead of the departed one whose views stay materialized.
    pub max_forward_cache_depth: usize,
    /// Paths remembered by the resolution cache (feature `cache`).
    pub resolution_cache_capacity: usize,
}

impl NavigatorConfig {
    pub const DEFAULT_MAX_HISTORY_SIZE: usize = 64;
    pub const DEFAULT_CACHE_DEPTH: usize = 5;
    pub const DEFAULT_RESOLUTION_CACHE_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history_size(mut self, size: usize) -> Self {
        self.max_history_size = size;
        self
    }

    pub fn with_max_back_cache_depth(mut self, depth: usize) -> Self {
        self.max_back_cache_depth = depth;
        self
    }

    pub fn with_max_forward_cache_depth(mut self, depth: usize) -> Self {
        self.max_forward_cache_depth = depth;
        self
    }

    pub fn with_resolution_cache_capacity(mut self, capacity: usize) -> Self {
        self.resolution_cache_capacity = capacity;
        self
    }

    /// Reject settings the navigator cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_history_size == 0 {
            return Err(NavigationError::configuration(
                "max_history_size must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_history_size: Self::DEFAULT_MAX_HISTORY_SIZE,
            max_back_cache_depth: Self::DEFAULT_CACHE_DEPTH,
            max_forward_cache_depth: Self::DEFAULT_CACHE_DEPTH,
            resolution_cache_capacity: Self::DEFAULT_RESOLUTION_CACHE_CAPACITY,
        }
    }
}
