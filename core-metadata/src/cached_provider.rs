//! Caching decorator for a [`MetadataProvider`].

use async_trait::async_trait;
use core_runtime::events::{CoreEvent, EventBus, MetadataEvent};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::cache::{quantize, CacheKey, CacheStats, FlushOutcome, KeyedCache, TimeQuantizedCache};
use crate::error::{MetadataError, Result};
use crate::models::{
    Chapter, ItemId, MetaInfo, PreviewThumbnailsInfo, RepoInfo, Stream, Subtitle, Thumbnail,
};
use crate::provider::MetadataProvider;

const REPO_KEY: &str = "repository";

/// Serves every [`MetadataProvider`] operation through its own coalescing
/// cache.
///
/// Preview thumbnails go through a [`TimeQuantizedCache`] whose bucket width
/// comes from the (cached) `PreviewThumbnailsInfo` of the item. Timestamp
/// links are cached per `(item, seconds)` and only requested when the
/// repository says it supports them.
pub struct CachedMetadataProvider {
    provider: Arc<dyn MetadataProvider>,
    meta_info: KeyedCache<CacheKey, MetaInfo>,
    streams: KeyedCache<CacheKey, Vec<Stream>>,
    subtitles: KeyedCache<CacheKey, Vec<Subtitle>>,
    chapters: KeyedCache<CacheKey, Vec<Chapter>>,
    thumbnails_info: KeyedCache<CacheKey, PreviewThumbnailsInfo>,
    thumbnails: TimeQuantizedCache<Option<Thumbnail>>,
    timestamp_links: KeyedCache<CacheKey, String>,
    repo_info: KeyedCache<&'static str, RepoInfo>,
    event_bus: Option<EventBus>,
}

impl CachedMetadataProvider {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            meta_info: KeyedCache::new("meta_info"),
            streams: KeyedCache::new("streams"),
            subtitles: KeyedCache::new("subtitles"),
            chapters: KeyedCache::new("chapters"),
            thumbnails_info: KeyedCache::new("thumbnails_info"),
            thumbnails: TimeQuantizedCache::new("thumbnails"),
            timestamp_links: KeyedCache::new("timestamp_links"),
            repo_info: KeyedCache::new("repo_info"),
            event_bus: None,
        }
    }

    /// Reports flushes on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Clears every cache and cancels every in-flight load.
    #[instrument(skip(self))]
    pub fn flush(&self) -> FlushOutcome {
        let outcome = self.meta_info.flush()
            + self.streams.flush()
            + self.subtitles.flush()
            + self.chapters.flush()
            + self.thumbnails_info.flush()
            + self.thumbnails.flush()
            + self.timestamp_links.flush()
            + self.repo_info.flush();

        info!(
            entries_cleared = outcome.entries_cleared,
            loads_cancelled = outcome.loads_cancelled,
            "Metadata caches flushed"
        );

        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Metadata(MetadataEvent::CacheFlushed {
                entries_cleared: outcome.entries_cleared,
                loads_cancelled: outcome.loads_cancelled,
            }))
            .ok();
        }

        outcome
    }

    /// Combined statistics of all facet caches.
    pub fn stats(&self) -> CacheStats {
        self.meta_info.stats()
            + self.streams.stats()
            + self.subtitles.stats()
            + self.chapters.stats()
            + self.thumbnails_info.stats()
            + self.thumbnails.stats()
            + self.timestamp_links.stats()
            + self.repo_info.stats()
    }

    /// Streams already loaded for `item_id`, without triggering a load.
    pub fn cached_streams(&self, item_id: &ItemId) -> Option<Vec<Stream>> {
        self.streams.peek(&CacheKey::from(item_id))
    }

    /// Thumbnail buckets currently stored, across every item.
    pub fn thumbnail_count(&self) -> usize {
        self.thumbnails.len()
    }

    pub fn inner(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    /// Reports a failed load on the event bus. Called once per caller, so
    /// coalesced waiters each see their own event.
    fn report_failure<T>(&self, key: &dyn fmt::Display, result: Result<T>) -> Result<T> {
        if let (Err(err), Some(bus)) = (&result, &self.event_bus) {
            if !matches!(err, MetadataError::Cancelled(_)) {
                bus.emit(CoreEvent::Metadata(MetadataEvent::LoadFailed {
                    key: key.to_string(),
                    message: err.to_string(),
                }))
                .ok();
            }
        }
        result
    }
}

#[async_trait]
impl MetadataProvider for CachedMetadataProvider {
    async fn get_meta_info(&self, item_id: &ItemId) -> Result<MetaInfo> {
        let key = CacheKey::from(item_id);
        let provider = Arc::clone(&self.provider);
        let id = item_id.clone();
        let result = self
            .meta_info
            .get(key.clone(), move || async move {
                provider.get_meta_info(&id).await
            })
            .await;
        self.report_failure(&key, result)
    }

    async fn get_streams(&self, item_id: &ItemId) -> Result<Vec<Stream>> {
        let key = CacheKey::from(item_id);
        let provider = Arc::clone(&self.provider);
        let id = item_id.clone();
        let result = self
            .streams
            .get(key.clone(), move || async move { provider.get_streams(&id).await })
            .await;
        self.report_failure(&key, result)
    }

    async fn get_subtitles(&self, item_id: &ItemId) -> Result<Vec<Subtitle>> {
        let key = CacheKey::from(item_id);
        let provider = Arc::clone(&self.provider);
        let id = item_id.clone();
        let result = self
            .subtitles
            .get(key.clone(), move || async move {
                provider.get_subtitles(&id).await
            })
            .await;
        self.report_failure(&key, result)
    }

    async fn get_chapters(&self, item_id: &ItemId) -> Result<Vec<Chapter>> {
        let key = CacheKey::from(item_id);
        let provider = Arc::clone(&self.provider);
        let id = item_id.clone();
        let result = self
            .chapters
            .get(key.clone(), move || async move { provider.get_chapters(&id).await })
            .await;
        self.report_failure(&key, result)
    }

    async fn get_preview_thumbnails_info(
        &self,
        item_id: &ItemId,
    ) -> Result<PreviewThumbnailsInfo> {
        let key = CacheKey::from(item_id);
        let provider = Arc::clone(&self.provider);
        let id = item_id.clone();
        let result = self
            .thumbnails_info
            .get(key.clone(), move || async move {
                provider.get_preview_thumbnails_info(&id).await
            })
            .await;
        self.report_failure(&key, result)
    }

    async fn get_preview_thumbnail(
        &self,
        item_id: &ItemId,
        timestamp_ms: i64,
    ) -> Result<Option<Thumbnail>> {
        let info = self.get_preview_thumbnails_info(item_id).await?;
        let provider = Arc::clone(&self.provider);
        let id = item_id.clone();
        let result = self
            .thumbnails
            .get(
                item_id,
                timestamp_ms,
                info.bucket_width_ms,
                move |corrected| async move {
                    provider.get_preview_thumbnail(&id, corrected).await
                },
            )
            .await;
        let key = CacheKey::Timestamped(
            item_id.clone(),
            quantize(timestamp_ms, info.bucket_width_ms),
        );
        self.report_failure(&key, result)
    }

    async fn get_timestamp_link(&self, item_id: &ItemId, timestamp_secs: i64) -> Result<String> {
        let repo = self.get_repo_info().await?;
        if !repo.supports_timestamped_links {
            debug!(item_id = %item_id, "Repository does not support timestamped links");
            return Err(MetadataError::Unsupported(
                "timestamped links are not supported by this repository".to_string(),
            ));
        }

        let key = CacheKey::Timestamped(item_id.clone(), timestamp_secs);
        let provider = Arc::clone(&self.provider);
        let id = item_id.clone();
        let result = self
            .timestamp_links
            .get(key.clone(), move || async move {
                provider.get_timestamp_link(&id, timestamp_secs).await
            })
            .await;
        self.report_failure(&key, result)
    }

    async fn get_repo_info(&self) -> Result<RepoInfo> {
        let provider = Arc::clone(&self.provider);
        let result = self
            .repo_info
            .get(REPO_KEY, move || async move { provider.get_repo_info().await })
            .await;
        self.report_failure(&REPO_KEY, result)
    }
}

impl fmt::Debug for CachedMetadataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedMetadataProvider")
            .field("streams", &self.streams)
            .field("thumbnails", &self.thumbnails)
            .field("has_event_bus", &self.event_bus.is_some())
            .finish()
    }
}
