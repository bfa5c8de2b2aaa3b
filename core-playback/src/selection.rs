use core_metadata::Stream;
use serde::{Deserialize, Serialize};

/// What the player should open for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "streams")]
pub enum StreamSelection {
    /// One stream covers playback on its own.
    Single(Stream),
    /// Streams to be muxed together. The first one carries the metadata.
    Multi(Vec<Stream>),
}

impl StreamSelection {
    pub fn streams(&self) -> &[Stream] {
        match self {
            StreamSelection::Single(stream) => std::slice::from_ref(stream),
            StreamSelection::Multi(streams) => streams,
        }
    }

    /// The stream whose metadata describes the playback.
    pub fn primary(&self) -> Option<&Stream> {
        self.streams().first()
    }

    /// `true` when separate video and audio streams must be combined.
    pub fn is_demuxed(&self) -> bool {
        matches!(self, StreamSelection::Multi(streams) if streams.len() > 1)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.streams()
            .iter()
            .map(|stream| stream.identifier.clone())
            .collect()
    }

    pub fn into_streams(self) -> Vec<Stream> {
        match self {
            StreamSelection::Single(stream) => vec![stream],
            StreamSelection::Multi(streams) => streams,
        }
    }
}
