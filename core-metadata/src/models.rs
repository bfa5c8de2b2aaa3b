//! Data model shared by the metadata provider, the caches and the selector.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Item identity
// ============================================================================

/// Opaque identifier of a playable item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Streams
// ============================================================================

/// What a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Video without audio
    Video,
    /// Audio only
    Audio,
    /// Muxed video and audio
    AudioAndVideo,
    /// Adaptive manifest (DASH/HLS) carrying both, resolved by the player
    Dynamic,
}

impl StreamKind {
    pub fn has_video(&self) -> bool {
        matches!(
            self,
            StreamKind::Video | StreamKind::AudioAndVideo | StreamKind::Dynamic
        )
    }

    pub fn has_audio(&self) -> bool {
        matches!(
            self,
            StreamKind::Audio | StreamKind::AudioAndVideo | StreamKind::Dynamic
        )
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, StreamKind::Dynamic)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::AudioAndVideo => "audio+video",
            StreamKind::Dynamic => "dynamic",
        };
        f.write_str(name)
    }
}

/// One playable stream of an item.
///
/// Languages are kept in an ordered set, so two streams listing the same
/// languages in a different order compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub identifier: String,
    pub kind: StreamKind,
    pub languages: BTreeSet<String>,
    pub location_uri: String,
    pub mime_type: Option<String>,
    /// Technical description for track pickers, when the provider knows it.
    pub track: Option<StreamTrack>,
}

impl Stream {
    pub fn new(
        identifier: impl Into<String>,
        kind: StreamKind,
        location_uri: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            languages: BTreeSet::new(),
            location_uri: location_uri.into(),
            mime_type: None,
            track: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.insert(language.into());
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages.extend(languages.into_iter().map(Into::into));
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_track(mut self, track: StreamTrack) -> Self {
        self.track = Some(track);
        self
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains(language)
    }
}

/// Technical description of a stream, shown in track pickers.
///
/// Ordering: every video track sorts before every audio track. Video tracks
/// compare by height, width, frame rate, then format; audio tracks by
/// language, bitrate, then format. Field order below encodes this, so the
/// derived `Ord` is the listing order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamTrack {
    Video {
        height: u32,
        width: u32,
        frame_rate: u32,
        format: String,
    },
    Audio {
        language: Option<String>,
        /// Kilobits per second
        bitrate: u32,
        format: String,
    },
}

impl StreamTrack {
    pub fn is_video(&self) -> bool {
        matches!(self, StreamTrack::Video { .. })
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, StreamTrack::Audio { .. })
    }
}

impl fmt::Display for StreamTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTrack::Video {
                height,
                frame_rate,
                format,
                ..
            } => write!(f, "{}p{} {}", height, frame_rate, format),
            StreamTrack::Audio {
                language,
                bitrate,
                format,
            } => match language {
                Some(language) => write!(f, "{} kbps {} {}", bitrate, format, language),
                None => write!(f, "{} kbps {}", bitrate, format),
            },
        }
    }
}

// ============================================================================
// Provider payloads
// ============================================================================

/// Descriptive metadata of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub title: String,
    pub channel_name: Option<String>,
    pub thumbnail_uri: Option<String>,
    pub length_secs: u64,
    pub is_live: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub language: String,
    pub label: String,
    pub location_uri: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub start_secs: u64,
    pub title: String,
    pub thumbnail_uri: Option<String>,
}

/// Layout of the seek-bar preview thumbnails of an item.
///
/// Thumbnail `i` covers `[i * bucket_width_ms, (i + 1) * bucket_width_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewThumbnailsInfo {
    pub count: u32,
    pub bucket_width_ms: i64,
}

impl PreviewThumbnailsInfo {
    /// Timestamps (ms) of every thumbnail bucket, in order. Stops at the
    /// first bucket whose start does not fit in an `i64`.
    pub fn bucket_starts(&self) -> impl Iterator<Item = i64> + '_ {
        (0..i64::from(self.count)).map_while(move |index| index.checked_mul(self.bucket_width_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Capabilities of the repository an item comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoInfo {
    pub pulls_from_network: bool,
    pub supports_timestamped_links: bool,
}
