use serde::Serialize;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters of a [`KeyedCache`](super::KeyedCache).
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time cache statistics.
///
/// - `hits`: served from a stored entry
/// - `misses`: started a loader
/// - `coalesced`: joined a load already in flight
/// - `failures`: loads that settled with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub failures: u64,
}

impl CacheStats {
    pub fn requests(&self) -> u64 {
        self.hits + self.misses + self.coalesced
    }

    /// Share of requests that did not start a loader.
    pub fn hit_rate(&self) -> f64 {
        match self.requests() {
            0 => 0.0,
            total => (self.hits + self.coalesced) as f64 / total as f64,
        }
    }
}

impl Add for CacheStats {
    type Output = CacheStats;

    fn add(self, other: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            coalesced: self.coalesced + other.coalesced,
            failures: self.failures + other.failures,
        }
    }
}
