//! # pusher-cache
//!
//! Freshness-bounded, single-flight memoization for expensive queries.
//!
//! Each [`FreshCache`] has two deadlines per entry:
//!
//! - `fresh_for`: the entry is served as-is
//! - `ttl`: past freshness but before this, the stale entry is served while
//!   one background reload runs; past it, callers wait for the reload
//!
//! At most one load per key runs at a time. Every caller waiting on that
//! load sees the same result, and a failed load leaves the previous value in
//! place. Bounded caches evict the least recently used key.

pub mod fresh;

use std::sync::Arc;
use std::time::Duration;

pub use fresh::FreshCache;

/// Timing and size limits for one cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    /// Serve without reloading while younger than this.
    pub fresh_for: Duration,
    /// Hard expiry; older entries are never served.
    pub ttl: Duration,
    /// Maximum number of keys, or unbounded.
    pub capacity: Option<usize>,
}

impl CachePolicy {
    pub fn new(fresh_for: Duration, ttl: Duration) -> Self {
        Self {
            fresh_for,
            ttl: ttl.max(fresh_for),
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }
}

/// A load failure shared by every caller that waited on it.
#[derive(Debug, thiserror::Error)]
pub enum CacheError<E> {
    #[error("{0}")]
    Load(Arc<E>),
}

impl<E> CacheError<E> {
    /// The loader's error.
    pub fn inner(&self) -> &E {
        match self {
            CacheError::Load(e) => e,
        }
    }
}
