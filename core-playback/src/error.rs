//! # Playback Error Types
//!
//! Errors raised while choosing and resolving what to play.

use core_metadata::MetadataError;
use thiserror::Error;

/// Errors that can occur while resolving playback for an item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    // ========================================================================
    // Selection Errors
    // ========================================================================
    /// No available stream can satisfy the requested kind of playback.
    #[error("No suitable {kind} stream for item {item_id}")]
    NoSuitableStream { item_id: String, kind: String },

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Essential metadata (the stream list) could not be loaded.
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    pub(crate) fn no_suitable_stream(item_id: impl ToString, kind: &str) -> Self {
        PlaybackError::NoSuitableStream {
            item_id: item_id.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Metadata(err) => err.is_transient(),
            PlaybackError::NoSuitableStream { .. } | PlaybackError::Internal(_) => false,
        }
    }

    /// Returns `true` if the streams loaded but none could be chosen.
    pub fn is_selection_error(&self) -> bool {
        matches!(self, PlaybackError::NoSuitableStream { .. })
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
