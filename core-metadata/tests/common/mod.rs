//! Counting fake provider shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use core_metadata::{
    Chapter, ItemId, MetaInfo, MetadataError, MetadataProvider, PreviewThumbnailsInfo, RepoInfo,
    Result, Stream, StreamKind, Subtitle, Thumbnail,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Records every call it receives, optionally after a delay, and can be told
/// to fail stream loads.
#[derive(Default)]
pub struct CountingProvider {
    calls: Mutex<HashMap<&'static str, usize>>,
    thumbnail_requests: Mutex<Vec<i64>>,
    latency: Option<Duration>,
    fail_streams: AtomicBool,
    pub thumbnail_count: u32,
    pub bucket_width_ms: i64,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            thumbnail_count: 4,
            bucket_width_ms: 500,
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail_streams(&self, fail: bool) {
        self.fail_streams.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    pub fn thumbnail_requests(&self) -> Vec<i64> {
        let mut requests = self.thumbnail_requests.lock().clone();
        requests.sort_unstable();
        requests
    }

    async fn record(&self, operation: &'static str) {
        *self.calls.lock().entry(operation).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

pub fn stream(id: &str) -> Stream {
    Stream::new(id, StreamKind::AudioAndVideo, format!("https://cdn.test/{}", id))
        .with_language("en")
}

#[async_trait]
impl MetadataProvider for CountingProvider {
    async fn get_meta_info(&self, item_id: &ItemId) -> Result<MetaInfo> {
        self.record("meta_info").await;
        Ok(MetaInfo {
            title: format!("Title of {}", item_id),
            channel_name: None,
            thumbnail_uri: None,
            length_secs: 60,
            is_live: false,
        })
    }

    async fn get_streams(&self, item_id: &ItemId) -> Result<Vec<Stream>> {
        self.record("streams").await;
        if self.fail_streams.load(Ordering::SeqCst) {
            return Err(MetadataError::Provider(format!(
                "streams unavailable for {}",
                item_id
            )));
        }
        Ok(vec![stream(&format!("{}-720p", item_id))])
    }

    async fn get_subtitles(&self, _item_id: &ItemId) -> Result<Vec<Subtitle>> {
        self.record("subtitles").await;
        Ok(Vec::new())
    }

    async fn get_chapters(&self, _item_id: &ItemId) -> Result<Vec<Chapter>> {
        self.record("chapters").await;
        Ok(Vec::new())
    }

    async fn get_preview_thumbnails_info(
        &self,
        _item_id: &ItemId,
    ) -> Result<PreviewThumbnailsInfo> {
        self.record("thumbnails_info").await;
        Ok(PreviewThumbnailsInfo {
            count: self.thumbnail_count,
            bucket_width_ms: self.bucket_width_ms,
        })
    }

    async fn get_preview_thumbnail(
        &self,
        _item_id: &ItemId,
        timestamp_ms: i64,
    ) -> Result<Option<Thumbnail>> {
        self.record("thumbnail").await;
        self.thumbnail_requests.lock().push(timestamp_ms);
        Ok(Some(Thumbnail {
            bytes: Bytes::from(timestamp_ms.to_be_bytes().to_vec()),
            width: 160,
            height: 90,
        }))
    }

    async fn get_timestamp_link(&self, item_id: &ItemId, timestamp_secs: i64) -> Result<String> {
        self.record("timestamp_link").await;
        Ok(format!("https://media.test/{}?t={}", item_id, timestamp_secs))
    }

    async fn get_repo_info(&self) -> Result<RepoInfo> {
        self.record("repo_info").await;
        Ok(RepoInfo {
            pulls_from_network: true,
            supports_timestamped_links: true,
        })
    }
}
