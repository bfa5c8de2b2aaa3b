//! # Stream Selector
//!
//! Chooses which of an item's streams to play.
//!
//! ## Algorithm
//!
//! 1. The best language is the first preferred language carried by any
//!    stream. The language pool holds the streams carrying it.
//! 2. When any stream has video:
//!    - an adaptive (dynamic) stream wins outright, from the language pool
//!      first;
//!    - otherwise a target identifier is taken from the preferred video ids
//!      (language pool, then every stream), falling back to the median of the
//!      video-capable streams;
//!    - a video-only match is paired with an audio stream, a muxed match is
//!      played alone.
//! 3. Otherwise an audio stream is chosen from the preferred audio ids,
//!    falling back to the median audio stream.
//!
//! The median is `pool[pool.len() / 2]`, so the choice depends on the order
//! the provider lists streams in. Selection is pure and deterministic.

use core_metadata::{ItemId, Stream, StreamKind};
use core_runtime::config::CoreConfig;
use core_runtime::logging::strip_uri;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};
use crate::mode::PlayMode;
use crate::selection::StreamSelection;

// ============================================================================
// Preferences
// ============================================================================

/// User preferences, each ordered from most to least preferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPreferences {
    pub preferred_video_ids: Vec<String>,
    pub preferred_audio_ids: Vec<String>,
    pub preferred_languages: Vec<String>,
}

impl StreamPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_video_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_audio_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_audio_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_languages = languages.into_iter().map(Into::into).collect();
        self
    }
}

impl From<&CoreConfig> for StreamPreferences {
    fn from(config: &CoreConfig) -> Self {
        Self {
            preferred_video_ids: config.preferred_video_ids.clone(),
            preferred_audio_ids: config.preferred_audio_ids.clone(),
            preferred_languages: config.preferred_languages.clone(),
        }
    }
}

// ============================================================================
// Selector
// ============================================================================

/// [`select_stream`] bound to a fixed set of preferences.
#[derive(Debug, Clone, Default)]
pub struct StreamSelector {
    preferences: StreamPreferences,
}

impl StreamSelector {
    pub fn new(preferences: StreamPreferences) -> Self {
        Self { preferences }
    }

    pub fn preferences(&self) -> &StreamPreferences {
        &self.preferences
    }

    pub fn select_stream(
        &self,
        item_id: &ItemId,
        play_intent: PlayMode,
        available_streams: &[Stream],
    ) -> Result<StreamSelection> {
        select_stream(item_id, play_intent, available_streams, &self.preferences)
    }
}

/// Picks the stream(s) to play for `item_id`.
///
/// The branch depends only on the streams: any stream with video selects
/// through the video path, whatever `play_intent` is. The intent is only
/// recorded in the logs.
///
/// # Errors
///
/// [`PlaybackError::NoSuitableStream`] when no stream can serve the request.
pub fn select_stream(
    item_id: &ItemId,
    play_intent: PlayMode,
    available_streams: &[Stream],
    preferences: &StreamPreferences,
) -> Result<StreamSelection> {
    let pools = Pools::new(available_streams, &preferences.preferred_languages);
    debug!(
        item_id = %item_id,
        intent = ?play_intent,
        streams = available_streams.len(),
        language = pools.best_language.unwrap_or("-"),
        "Selecting stream"
    );

    if available_streams.iter().any(|stream| stream.kind.has_video()) {
        return select_video(item_id, &pools, preferences);
    }

    pools
        .audio_only(&preferences.preferred_audio_ids)
        .map(|audio| StreamSelection::Single(audio.clone()))
        .ok_or_else(|| PlaybackError::no_suitable_stream(item_id, "audio"))
}

fn select_video(
    item_id: &ItemId,
    pools: &Pools<'_>,
    preferences: &StreamPreferences,
) -> Result<StreamSelection> {
    if let Some(dynamic) = pools.find(|stream| stream.kind.is_dynamic()) {
        debug!(
            item_id = %item_id,
            stream = %dynamic.identifier,
            uri = %strip_uri(&dynamic.location_uri),
            "Using adaptive stream"
        );
        return Ok(StreamSelection::Single(dynamic.clone()));
    }

    let median = pools.median(is_plain_video);
    let target = pools
        .preferred(&preferences.preferred_video_ids, is_plain_video)
        .or(median)
        .map(|stream| stream.identifier.as_str());

    if let Some(target) = target {
        let with_target = |kind: StreamKind| {
            move |stream: &Stream| stream.kind == kind && stream.identifier == target
        };

        if let Some(video) = pools.find(with_target(StreamKind::Video)) {
            return match pools.paired_audio(&preferences.preferred_audio_ids) {
                Some(audio) => {
                    debug!(
                        item_id = %item_id,
                        video = %strip_uri(&video.location_uri),
                        audio = %strip_uri(&audio.location_uri),
                        "Selected demuxed streams"
                    );
                    Ok(StreamSelection::Multi(vec![video.clone(), audio.clone()]))
                }
                None => {
                    warn!(
                        item_id = %item_id,
                        video = %video.identifier,
                        "No audio stream to pair with video-only stream"
                    );
                    Ok(StreamSelection::Single(video.clone()))
                }
            };
        }

        if let Some(muxed) = pools.find(with_target(StreamKind::AudioAndVideo)) {
            debug!(
                item_id = %item_id,
                stream = %muxed.identifier,
                uri = %strip_uri(&muxed.location_uri),
                "Selected muxed stream"
            );
            return Ok(StreamSelection::Single(muxed.clone()));
        }
    }

    median
        .map(|stream| StreamSelection::Single(stream.clone()))
        .ok_or_else(|| PlaybackError::no_suitable_stream(item_id, "video"))
}

fn is_plain_video(stream: &Stream) -> bool {
    stream.kind.has_video() && !stream.kind.is_dynamic()
}

fn is_audio_only(stream: &Stream) -> bool {
    stream.kind == StreamKind::Audio
}

// ============================================================================
// Candidate pools
// ============================================================================

struct Pools<'a> {
    all: &'a [Stream],
    language: Vec<&'a Stream>,
    best_language: Option<&'a str>,
}

impl<'a> Pools<'a> {
    fn new(all: &'a [Stream], preferred_languages: &'a [String]) -> Self {
        let best_language = preferred_languages
            .iter()
            .map(String::as_str)
            .find(|language| all.iter().any(|stream| stream.has_language(language)));

        let language = match best_language {
            Some(language) => all
                .iter()
                .filter(|stream| stream.has_language(language))
                .collect(),
            None => Vec::new(),
        };

        Self {
            all,
            language,
            best_language,
        }
    }

    /// First match in the language pool, else in every stream.
    fn find<P>(&self, predicate: P) -> Option<&'a Stream>
    where
        P: Fn(&Stream) -> bool,
    {
        self.language
            .iter()
            .copied()
            .find(|stream| predicate(*stream))
            .or_else(|| self.all.iter().find(|stream| predicate(*stream)))
    }

    /// Stream for the first preferred id found in the language pool, then
    /// for the first found among every stream.
    fn preferred<P>(&self, ids: &[String], accepts: P) -> Option<&'a Stream>
    where
        P: Fn(&Stream) -> bool,
    {
        let lookup = |pool: &mut dyn Iterator<Item = &'a Stream>| {
            let candidates: Vec<&'a Stream> = pool.filter(|stream| accepts(*stream)).collect();
            ids.iter().find_map(|id| {
                candidates
                    .iter()
                    .copied()
                    .find(|stream| &stream.identifier == id)
            })
        };

        lookup(&mut self.language.iter().copied()).or_else(|| lookup(&mut self.all.iter()))
    }

    /// Median candidate of the language pool, or of every stream when the
    /// language pool has none.
    fn median<P>(&self, accepts: P) -> Option<&'a Stream>
    where
        P: Fn(&Stream) -> bool,
    {
        let in_language: Vec<&'a Stream> = self
            .language
            .iter()
            .copied()
            .filter(|stream| accepts(*stream))
            .collect();
        let pool = if in_language.is_empty() {
            self.all.iter().filter(|stream| accepts(*stream)).collect()
        } else {
            in_language
        };
        pool.get(pool.len() / 2).copied()
    }

    fn audio_only(&self, preferred_ids: &[String]) -> Option<&'a Stream> {
        self.preferred(preferred_ids, is_audio_only)
            .or_else(|| self.median(is_audio_only))
    }

    /// Audio to mux with a video-only stream.
    fn paired_audio(&self, preferred_ids: &[String]) -> Option<&'a Stream> {
        self.preferred(preferred_ids, is_audio_only).or_else(|| {
            let in_language: Vec<&'a Stream> = self
                .language
                .iter()
                .copied()
                .filter(|stream| is_audio_only(stream))
                .collect();
            in_language
                .get(in_language.len() / 2)
                .copied()
                .or_else(|| self.all.iter().find(|stream| is_audio_only(stream)))
        })
    }
}
