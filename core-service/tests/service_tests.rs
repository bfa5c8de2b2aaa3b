//! End-to-end tests of the core service façade.

use async_trait::async_trait;
use bridge_traits::{BridgeError, PowerChangeStream, PowerMonitor, PowerState};
use core_metadata::{
    Chapter, ItemId, MetaInfo, MetadataError, MetadataProvider, PreviewThumbnailsInfo, RepoInfo,
    Result as MetadataResult, Stream, StreamKind, Subtitle, Thumbnail,
};
use core_playback::PlayMode;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, MetadataEvent, PrefetchEvent};
use core_service::{CoreError, CoreService};
use mockall::mock;
use std::sync::Arc;

mock! {
    Provider {}

    #[async_trait]
    impl MetadataProvider for Provider {
        async fn get_meta_info(&self, item_id: &ItemId) -> MetadataResult<MetaInfo>;
        async fn get_streams(&self, item_id: &ItemId) -> MetadataResult<Vec<Stream>>;
        async fn get_subtitles(&self, item_id: &ItemId) -> MetadataResult<Vec<Subtitle>>;
        async fn get_chapters(&self, item_id: &ItemId) -> MetadataResult<Vec<Chapter>>;
        async fn get_preview_thumbnails_info(&self, item_id: &ItemId) -> MetadataResult<PreviewThumbnailsInfo>;
        async fn get_preview_thumbnail(&self, item_id: &ItemId, timestamp_ms: i64) -> MetadataResult<Option<Thumbnail>>;
        async fn get_timestamp_link(&self, item_id: &ItemId, timestamp_secs: i64) -> MetadataResult<String>;
        async fn get_repo_info(&self) -> MetadataResult<RepoInfo>;
    }
}

mock! {
    Power {}

    #[async_trait]
    impl PowerMonitor for Power {
        async fn get_power_state(&self) -> bridge_traits::Result<PowerState>;
        async fn subscribe_changes(&self) -> bridge_traits::Result<Box<dyn PowerChangeStream>>;
    }
}

struct Closed;

#[async_trait]
impl PowerChangeStream for Closed {
    async fn next(&mut self) -> Option<PowerState> {
        None
    }
}

/// Provider where every facet loads exactly once.
fn provider_loading_once() -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_get_streams().times(1).returning(|_| {
        Ok(vec![
            Stream::new("360p", StreamKind::AudioAndVideo, "https://cdn.test/360p"),
            Stream::new("dash", StreamKind::Dynamic, "https://cdn.test/manifest.mpd"),
        ])
    });
    provider.expect_get_meta_info().times(1).returning(|item_id| {
        Ok(MetaInfo {
            title: item_id.to_string(),
            channel_name: None,
            thumbnail_uri: None,
            length_secs: 30,
            is_live: false,
        })
    });
    provider
        .expect_get_subtitles()
        .times(1)
        .returning(|_| Ok(Vec::new()));
    provider
        .expect_get_chapters()
        .times(1)
        .returning(|_| Ok(Vec::new()));
    provider
        .expect_get_preview_thumbnails_info()
        .times(1)
        .returning(|_| {
            Ok(PreviewThumbnailsInfo {
                count: 2,
                bucket_width_ms: 5_000,
            })
        });
    provider
        .expect_get_preview_thumbnail()
        .times(2)
        .returning(|_, _| Ok(None));
    provider
}

#[tokio::test]
async fn test_resolve_and_prefetch_share_loads() {
    let config = CoreConfig::builder().build().unwrap();
    let core = CoreService::new(config, Arc::new(provider_loading_once()))
        .await
        .unwrap();
    let item = ItemId::new("clip");

    let handle = core.prefetch(&item).expect("warmup starts");
    let resolved = core.resolve(&item, PlayMode::EmbeddedVideo).await.unwrap();
    let report = handle.wait().await.unwrap();

    assert_eq!(resolved.selection.identifiers(), vec!["dash"]);
    assert_eq!(report.failed, 0);
    assert!(core.prefetch(&item).is_none());

    // Thumbnail within the first bucket is already cached.
    let thumbnail = core
        .provider()
        .get_preview_thumbnail(&item, 4_999)
        .await
        .unwrap();
    assert!(thumbnail.is_none());
}

#[tokio::test]
async fn test_disabled_prefetch_only_loads_what_is_read() {
    let mut provider = MockProvider::new();
    provider
        .expect_get_chapters()
        .times(1)
        .returning(|_| Ok(Vec::new()));
    provider.expect_get_streams().never();

    let config = CoreConfig::builder()
        .enable_prefetch(false)
        .build()
        .unwrap();
    let core = CoreService::new(config, Arc::new(provider)).await.unwrap();
    let item = ItemId::new("clip");

    assert!(core.prefetcher().is_disabled());
    assert!(core.prefetch(&item).is_none());
    core.provider().get_chapters(&item).await.unwrap();
    core.provider().get_chapters(&item).await.unwrap();
    assert_eq!(core.prefetcher().warmed_count(), 0);
}

#[tokio::test]
async fn test_power_saving_suspends_prefetch() {
    let mut power = MockPower::new();
    power
        .expect_get_power_state()
        .returning(|| Ok(PowerState::PowerSaving));
    power
        .expect_subscribe_changes()
        .returning(|| Ok(Box::new(Closed) as Box<dyn PowerChangeStream>));

    let config = CoreConfig::builder()
        .respect_power_saving(true)
        .power_monitor(Arc::new(power))
        .build()
        .unwrap();
    let core = CoreService::new(config, Arc::new(MockProvider::new()))
        .await
        .unwrap();

    assert!(core.prefetcher().is_disabled());
    assert!(core.prefetch(&ItemId::new("clip")).is_none());
}

#[tokio::test]
async fn test_power_saving_without_monitor_is_rejected() {
    let mut config = CoreConfig::builder().build().unwrap();
    config.features.respect_power_saving = true;

    let err = CoreService::new(config, Arc::new(MockProvider::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::CapabilityMissing { .. }));
}

#[tokio::test]
async fn test_power_subscription_failure_fails_initialization() {
    let mut power = MockPower::new();
    power
        .expect_get_power_state()
        .returning(|| Ok(PowerState::Normal));
    power
        .expect_subscribe_changes()
        .returning(|| Err(BridgeError::NotAvailable("battery service".to_string())));

    let config = CoreConfig::builder()
        .respect_power_saving(true)
        .power_monitor(Arc::new(power))
        .build()
        .unwrap();
    let err = CoreService::new(config, Arc::new(MockProvider::new()))
        .await
        .unwrap_err();

    match err {
        CoreError::InitializationFailed(message) => {
            assert!(message.contains("battery service"))
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_flush_is_reported_and_allows_rewarming() {
    let mut provider = MockProvider::new();
    provider
        .expect_get_subtitles()
        .times(2)
        .returning(|_| Err(MetadataError::Provider("offline".to_string())));

    let config = CoreConfig::builder()
        .enable_prefetch(false)
        .build()
        .unwrap();
    let core = CoreService::new(config, Arc::new(provider)).await.unwrap();
    let mut events = core.events();
    let item = ItemId::new("clip");

    assert!(core.provider().get_subtitles(&item).await.is_err());
    assert!(core.provider().get_subtitles(&item).await.is_err());
    core.flush();

    let mut saw_flush = false;
    while let Some(Ok(event)) = events.try_recv() {
        match event {
            CoreEvent::Metadata(MetadataEvent::CacheFlushed { .. }) => saw_flush = true,
            CoreEvent::Metadata(MetadataEvent::LoadFailed { .. }) => {}
            CoreEvent::Prefetch(PrefetchEvent::SuspendedChanged { suspended }) => {
                assert!(suspended)
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(saw_flush);
    assert_eq!(core.cache_stats().failures, 2);
}
