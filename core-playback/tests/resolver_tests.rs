//! Resolving playback through the caching provider.

use async_trait::async_trait;
use core_metadata::{
    CachedMetadataProvider, Chapter, ItemId, MetaInfo, MetadataError, MetadataProvider,
    PreviewThumbnailsInfo, RepoInfo, Result, Stream, StreamKind, Subtitle, Thumbnail,
};
use core_playback::{
    PlayMode, PlaybackResolver, StreamPreferences, StreamSelection, StreamSelector, UiModeState,
};
use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream, PlaybackEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Library with one English/Spanish item. Subtitles always fail.
#[derive(Default)]
struct Library {
    stream_loads: AtomicUsize,
}

fn library_streams() -> Vec<Stream> {
    vec![
        Stream::new("480p", StreamKind::Video, "https://cdn.test/480p").with_language("en"),
        Stream::new("720p", StreamKind::Video, "https://cdn.test/720p").with_language("en"),
        Stream::new("1080p", StreamKind::Video, "https://cdn.test/1080p").with_language("en"),
        Stream::new("128k-en", StreamKind::Audio, "https://cdn.test/a-en").with_language("en"),
        Stream::new("128k-es", StreamKind::Audio, "https://cdn.test/a-es").with_language("es"),
    ]
}

#[async_trait]
impl MetadataProvider for Library {
    async fn get_meta_info(&self, item_id: &ItemId) -> Result<MetaInfo> {
        Ok(MetaInfo {
            title: item_id.to_string(),
            channel_name: None,
            thumbnail_uri: None,
            length_secs: 120,
            is_live: false,
        })
    }

    async fn get_streams(&self, _item_id: &ItemId) -> Result<Vec<Stream>> {
        self.stream_loads.fetch_add(1, Ordering::SeqCst);
        Ok(library_streams())
    }

    async fn get_subtitles(&self, _item_id: &ItemId) -> Result<Vec<Subtitle>> {
        Err(MetadataError::Provider("subtitle service down".to_string()))
    }

    async fn get_chapters(&self, _item_id: &ItemId) -> Result<Vec<Chapter>> {
        Ok(Vec::new())
    }

    async fn get_preview_thumbnails_info(&self, _item_id: &ItemId) -> Result<PreviewThumbnailsInfo> {
        Ok(PreviewThumbnailsInfo {
            count: 0,
            bucket_width_ms: 1000,
        })
    }

    async fn get_preview_thumbnail(
        &self,
        _item_id: &ItemId,
        _timestamp_ms: i64,
    ) -> Result<Option<Thumbnail>> {
        Ok(None)
    }

    async fn get_timestamp_link(&self, _item_id: &ItemId, _timestamp_secs: i64) -> Result<String> {
        Err(MetadataError::Unsupported("links".to_string()))
    }

    async fn get_repo_info(&self) -> Result<RepoInfo> {
        Ok(RepoInfo::default())
    }
}

fn english() -> StreamSelector {
    StreamSelector::new(StreamPreferences::new().with_languages(["en"]))
}

#[tokio::test]
async fn test_resolves_demuxed_language_selection() {
    let library = Arc::new(Library::default());
    let cache = Arc::new(CachedMetadataProvider::new(library.clone()));
    let bus = EventBus::new(16);
    let mut warnings = EventStream::new(bus.subscribe())
        .filter(|event| event.severity() == EventSeverity::Warning);
    let resolver = PlaybackResolver::new(cache, english()).with_event_bus(bus);

    let resolved = resolver
        .resolve(&ItemId::new("movie"), PlayMode::EmbeddedVideo)
        .await
        .unwrap();

    let streams = library_streams();
    assert_eq!(
        resolved.selection,
        StreamSelection::Multi(vec![streams[1].clone(), streams[3].clone()])
    );
    assert!(resolved.subtitles.is_empty());
    assert!(resolved.meta_info.is_some());
    assert!(matches!(
        warnings.recv().await.unwrap(),
        CoreEvent::Playback(PlaybackEvent::EnrichmentFailed { .. })
    ));
}

#[tokio::test]
async fn test_repeated_resolution_hits_cache() {
    let library = Arc::new(Library::default());
    let cache = Arc::new(CachedMetadataProvider::new(library.clone()));
    let resolver = PlaybackResolver::new(cache.clone(), english());
    let item = ItemId::new("movie");

    let first = resolver.resolve(&item, PlayMode::EmbeddedVideo).await.unwrap();
    let again = resolver.resolve(&item, PlayMode::EmbeddedVideo).await.unwrap();

    assert_eq!(first.selection, again.selection);
    assert_eq!(library.stream_loads.load(Ordering::SeqCst), 1);

    cache.flush();
    resolver.resolve(&item, PlayMode::EmbeddedVideo).await.unwrap();
    assert_eq!(library.stream_loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_audio_mode_resolves_audio_stream() {
    let library = Arc::new(Library::default());
    let resolver = PlaybackResolver::new(library, english());

    let state = UiModeState::FullscreenVideo.to_audio_equivalent();
    let resolved = resolver
        .resolve(&ItemId::new("movie"), state.to_play_mode())
        .await
        .unwrap();

    assert_eq!(state, UiModeState::FullscreenAudio);
    assert_eq!(resolved.selection.identifiers(), vec!["128k-en"]);
    assert!(state.background_jobs().progress_polling);
}
