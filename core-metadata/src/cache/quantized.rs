use std::fmt;
use std::future::Future;

use super::key::CacheKey;
use super::keyed::{FlushOutcome, KeyedCache};
use super::stats::CacheStats;
use crate::error::Result;
use crate::models::ItemId;

/// Snaps `timestamp_ms` down to the start of its bucket.
///
/// Uses euclidean division, so negative timestamps floor towards negative
/// infinity. A non-positive `bucket_width_ms` leaves the timestamp unchanged.
/// A bucket start below `i64::MIN` saturates to `i64::MIN`.
pub fn quantize(timestamp_ms: i64, bucket_width_ms: i64) -> i64 {
    if bucket_width_ms <= 0 {
        return timestamp_ms;
    }
    timestamp_ms
        .div_euclid(bucket_width_ms)
        .saturating_mul(bucket_width_ms)
}

/// Cache for per-timestamp resources (preview thumbnails) that only change at
/// bucket boundaries.
///
/// All timestamps inside one bucket share a single entry and a single load.
/// The loader is called with the bucket start, not the requested timestamp.
pub struct TimeQuantizedCache<T> {
    cache: KeyedCache<CacheKey, T>,
}

impl<T> TimeQuantizedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            cache: KeyedCache::new(name),
        }
    }

    pub async fn get<F, Fut>(
        &self,
        item_id: &ItemId,
        timestamp_ms: i64,
        bucket_width_ms: i64,
        loader: F,
    ) -> Result<T>
    where
        F: FnOnce(i64) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let corrected = quantize(timestamp_ms, bucket_width_ms);
        self.cache
            .get(CacheKey::Timestamped(item_id.clone(), corrected), move || {
                loader(corrected)
            })
            .await
    }

    /// Stored value for the bucket containing `timestamp_ms`.
    pub fn peek(&self, item_id: &ItemId, timestamp_ms: i64, bucket_width_ms: i64) -> Option<T> {
        let corrected = quantize(timestamp_ms, bucket_width_ms);
        self.cache
            .peek(&CacheKey::Timestamped(item_id.clone(), corrected))
    }

    pub fn flush(&self) -> FlushOutcome {
        self.cache.flush()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl<T> fmt::Debug for TimeQuantizedCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeQuantizedCache")
            .field("cache", &self.cache)
            .finish()
    }
}
