//! # Playback Resolver
//!
//! Turns an item id into everything the player needs to start: the selected
//! streams plus optional enrichment (title, subtitles, chapters).
//!
//! Streams are essential. If they cannot be loaded, or none can be selected,
//! resolution fails. Enrichment is best effort: a facet that fails is logged,
//! reported as [`PlaybackEvent::EnrichmentFailed`] and left empty.

use core_metadata::{
    Chapter, ItemId, MetaInfo, MetadataError, MetadataProvider, StreamTrack, Subtitle,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::mode::PlayMode;
use crate::selection::StreamSelection;
use crate::selector::StreamSelector;
use crate::tracks::available_tracks;

/// Everything needed to start playing an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlayback {
    pub item_id: ItemId,
    pub play_intent: PlayMode,
    pub selection: StreamSelection,
    /// `None` when the metadata facet failed to load.
    pub meta_info: Option<MetaInfo>,
    pub subtitles: Vec<Subtitle>,
    pub chapters: Vec<Chapter>,
    /// Sorted, deduplicated tracks of every available stream.
    pub available_tracks: Vec<StreamTrack>,
}

/// Resolves items against a [`MetadataProvider`], usually the cached one.
pub struct PlaybackResolver {
    provider: Arc<dyn MetadataProvider>,
    selector: StreamSelector,
    event_bus: Option<EventBus>,
}

impl PlaybackResolver {
    pub fn new(provider: Arc<dyn MetadataProvider>, selector: StreamSelector) -> Self {
        Self {
            provider,
            selector,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn selector(&self) -> &StreamSelector {
        &self.selector
    }

    /// Loads every facet of `item_id` concurrently and selects its streams.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Metadata`] if the stream list could not be loaded
    /// - [`PlaybackError::NoSuitableStream`] if no stream fits `play_intent`
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub async fn resolve(&self, item_id: &ItemId, play_intent: PlayMode) -> Result<ResolvedPlayback> {
        let (streams, meta_info, subtitles, chapters) = tokio::join!(
            self.provider.get_streams(item_id),
            self.provider.get_meta_info(item_id),
            self.provider.get_subtitles(item_id),
            self.provider.get_chapters(item_id),
        );

        let outcome = streams.map_err(PlaybackError::from).and_then(|streams| {
            self.selector
                .select_stream(item_id, play_intent, &streams)
                .map(|selection| (selection, available_tracks(&streams)))
        });
        let (selection, available_tracks) = match outcome {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(error = %err, "Failed to resolve playback");
                self.emit(PlaybackEvent::ResolutionFailed {
                    item_id: item_id.to_string(),
                    message: err.to_string(),
                    recoverable: err.is_transient(),
                });
                return Err(err);
            }
        };

        let resolved = ResolvedPlayback {
            item_id: item_id.clone(),
            play_intent,
            meta_info: self.enrichment(item_id, "meta_info", meta_info),
            subtitles: self
                .enrichment(item_id, "subtitles", subtitles)
                .unwrap_or_default(),
            chapters: self
                .enrichment(item_id, "chapters", chapters)
                .unwrap_or_default(),
            available_tracks,
            selection,
        };

        info!(
            streams = ?resolved.selection.identifiers(),
            demuxed = resolved.selection.is_demuxed(),
            "Resolved playback"
        );
        self.emit(PlaybackEvent::StreamSelected {
            item_id: item_id.to_string(),
            stream_ids: resolved.selection.identifiers(),
            demuxed: resolved.selection.is_demuxed(),
        });

        Ok(resolved)
    }

    fn enrichment<T>(
        &self,
        item_id: &ItemId,
        facet: &'static str,
        result: std::result::Result<T, MetadataError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(item_id = %item_id, facet, error = %err, "Continuing without metadata facet");
                self.emit(PlaybackEvent::EnrichmentFailed {
                    item_id: item_id.to_string(),
                    facet: facet.to_string(),
                    message: err.to_string(),
                });
                None
            }
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            if bus.emit(CoreEvent::Playback(event)).is_err() {
                debug!("No subscribers for playback event");
            }
        }
    }
}

impl std::fmt::Debug for PlaybackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackResolver")
            .field("selector", &self.selector)
            .field("events", &self.event_bus.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_metadata::{
        PreviewThumbnailsInfo, RepoInfo, Result as MetadataResult, Stream, StreamKind, Thumbnail,
    };
    use mockall::mock;

    use crate::selector::StreamPreferences;

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

    fn meta() -> MetaInfo {
        MetaInfo {
            title: "Big Buck Bunny".to_string(),
            channel_name: Some("Blender".to_string()),
            thumbnail_uri: None,
            length_secs: 596,
            is_live: false,
        }
    }

    fn streams() -> Vec<Stream> {
        vec![
            Stream::new("360p", StreamKind::AudioAndVideo, "https://cdn.test/360p").with_track(
                StreamTrack::Video {
                    height: 360,
                    width: 640,
                    frame_rate: 30,
                    format: "mp4".to_string(),
                },
            ),
            Stream::new("720p", StreamKind::AudioAndVideo, "https://cdn.test/720p").with_track(
                StreamTrack::Video {
                    height: 720,
                    width: 1280,
                    frame_rate: 30,
                    format: "mp4".to_string(),
                },
            ),
        ]
    }

    fn resolver(provider: MockProvider) -> PlaybackResolver {
        PlaybackResolver::new(
            Arc::new(provider),
            StreamSelector::new(StreamPreferences::new()),
        )
    }

    #[tokio::test]
    async fn test_resolves_selection_and_enrichment() {
        let mut provider = MockProvider::new();
        provider.expect_get_streams().returning(|_| Ok(streams()));
        provider.expect_get_meta_info().returning(|_| Ok(meta()));
        provider.expect_get_subtitles().returning(|_| Ok(Vec::new()));
        provider.expect_get_chapters().returning(|_| {
            Ok(vec![Chapter {
                start_secs: 0,
                title: "Intro".to_string(),
                thumbnail_uri: None,
            }])
        });

        let resolved = resolver(provider)
            .resolve(&ItemId::new("bunny"), PlayMode::EmbeddedVideo)
            .await
            .unwrap();

        assert_eq!(resolved.selection.identifiers(), vec!["720p"]);
        assert_eq!(resolved.meta_info, Some(meta()));
        assert_eq!(resolved.chapters.len(), 1);
        assert_eq!(resolved.available_tracks.len(), 2);
        assert!(resolved.available_tracks[0] < resolved.available_tracks[1]);
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_reported_not_fatal() {
        let mut provider = MockProvider::new();
        provider.expect_get_streams().returning(|_| Ok(streams()));
        provider
            .expect_get_meta_info()
            .returning(|_| Err(MetadataError::Provider("timeout".to_string())));
        provider.expect_get_subtitles().returning(|_| Ok(Vec::new()));
        provider.expect_get_chapters().returning(|_| Ok(Vec::new()));

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let resolved = resolver(provider)
            .with_event_bus(bus)
            .resolve(&ItemId::new("bunny"), PlayMode::FullscreenVideo)
            .await
            .unwrap();

        assert_eq!(resolved.meta_info, None);
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Playback(PlaybackEvent::EnrichmentFailed {
                item_id: "bunny".to_string(),
                facet: "meta_info".to_string(),
                message: "Provider error: timeout".to_string(),
            })
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Playback(PlaybackEvent::StreamSelected { .. })
        ));
    }

    #[tokio::test]
    async fn test_stream_failure_is_fatal() {
        let mut provider = MockProvider::new();
        provider
            .expect_get_streams()
            .returning(|_| Err(MetadataError::Provider("offline".to_string())));
        provider.expect_get_meta_info().returning(|_| Ok(meta()));
        provider.expect_get_subtitles().returning(|_| Ok(Vec::new()));
        provider.expect_get_chapters().returning(|_| Ok(Vec::new()));

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let err = resolver(provider)
            .with_event_bus(bus)
            .resolve(&ItemId::new("bunny"), PlayMode::EmbeddedVideo)
            .await
            .unwrap_err();

        assert!(matches!(err, PlaybackError::Metadata(_)));
        assert!(err.is_transient());
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Playback(PlaybackEvent::ResolutionFailed {
                recoverable: true,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_stream_list_is_a_selection_error() {
        let mut provider = MockProvider::new();
        provider.expect_get_streams().returning(|_| Ok(Vec::new()));
        provider.expect_get_meta_info().returning(|_| Ok(meta()));
        provider.expect_get_subtitles().returning(|_| Ok(Vec::new()));
        provider.expect_get_chapters().returning(|_| Ok(Vec::new()));

        let err = resolver(provider)
            .resolve(&ItemId::new("bunny"), PlayMode::EmbeddedAudio)
            .await
            .unwrap_err();

        assert!(err.is_selection_error());
    }
}
