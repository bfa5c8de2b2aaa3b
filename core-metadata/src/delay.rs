//! Latency-injecting provider decorator for tests and local development.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::error::Result;
use crate::models::{
    Chapter, ItemId, MetaInfo, PreviewThumbnailsInfo, RepoInfo, Stream, Subtitle, Thumbnail,
};
use crate::provider::MetadataProvider;

/// Sleeps for a fixed duration before every call to the wrapped provider.
#[derive(Clone)]
pub struct DelayProvider {
    inner: Arc<dyn MetadataProvider>,
    delay: Duration,
}

impl DelayProvider {
    pub fn new(inner: Arc<dyn MetadataProvider>, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    async fn pause(&self, operation: &'static str) {
        trace!(operation, delay_ms = self.delay.as_millis() as u64, "Delaying provider call");
        tokio::time::sleep(self.delay).await;
    }
}

impl std::fmt::Debug for DelayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayProvider")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetadataProvider for DelayProvider {
    async fn get_meta_info(&self, item_id: &ItemId) -> Result<MetaInfo> {
        self.pause("get_meta_info").await;
        self.inner.get_meta_info(item_id).await
    }

    async fn get_streams(&self, item_id: &ItemId) -> Result<Vec<Stream>> {
        self.pause("get_streams").await;
        self.inner.get_streams(item_id).await
    }

    async fn get_subtitles(&self, item_id: &ItemId) -> Result<Vec<Subtitle>> {
        self.pause("get_subtitles").await;
        self.inner.get_subtitles(item_id).await
    }

    async fn get_chapters(&self, item_id: &ItemId) -> Result<Vec<Chapter>> {
        self.pause("get_chapters").await;
        self.inner.get_chapters(item_id).await
    }

    async fn get_preview_thumbnails_info(
        &self,
        item_id: &ItemId,
    ) -> Result<PreviewThumbnailsInfo> {
        self.pause("get_preview_thumbnails_info").await;
        self.inner.get_preview_thumbnails_info(item_id).await
    }

    async fn get_preview_thumbnail(
        &self,
        item_id: &ItemId,
        timestamp_ms: i64,
    ) -> Result<Option<Thumbnail>> {
        self.pause("get_preview_thumbnail").await;
        self.inner.get_preview_thumbnail(item_id, timestamp_ms).await
    }

    async fn get_timestamp_link(&self, item_id: &ItemId, timestamp_secs: i64) -> Result<String> {
        self.pause("get_timestamp_link").await;
        self.inner.get_timestamp_link(item_id, timestamp_secs).await
    }

    async fn get_repo_info(&self) -> Result<RepoInfo> {
        self.pause("get_repo_info").await;
        self.inner.get_repo_info().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl MetadataProvider for Fixed {
        async fn get_meta_info(&self, _item_id: &ItemId) -> Result<MetaInfo> {
            unimplemented!()
        }
        async fn get_streams(&self, _item_id: &ItemId) -> Result<Vec<Stream>> {
            unimplemented!()
        }
        async fn get_subtitles(&self, _item_id: &ItemId) -> Result<Vec<Subtitle>> {
            unimplemented!()
        }
        async fn get_chapters(&self, _item_id: &ItemId) -> Result<Vec<Chapter>> {
            Ok(Vec::new())
        }
        async fn get_preview_thumbnails_info(
            &self,
            _item_id: &ItemId,
        ) -> Result<PreviewThumbnailsInfo> {
            unimplemented!()
        }
        async fn get_preview_thumbnail(
            &self,
            _item_id: &ItemId,
            _timestamp_ms: i64,
        ) -> Result<Option<Thumbnail>> {
            unimplemented!()
        }
        async fn get_timestamp_link(
            &self,
            _item_id: &ItemId,
            _timestamp_secs: i64,
        ) -> Result<String> {
            unimplemented!()
        }
        async fn get_repo_info(&self) -> Result<RepoInfo> {
            Ok(RepoInfo::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_wait_for_delay() {
        let provider = DelayProvider::new(Arc::new(Fixed), Duration::from_secs(2));
        let started = tokio::time::Instant::now();

        provider.get_chapters(&ItemId::new("item-1")).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
