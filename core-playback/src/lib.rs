//! # Playback Module
//!
//! Decides what to play and tracks which player screen is shown.
//!
//! ## Overview
//!
//! This module handles:
//! - Stream selection by language, preferred ids and a median fallback
//!   ([`StreamSelector`])
//! - Track listings for the stream picker ([`tracks`])
//! - The player UI state machine and the background jobs each state needs
//!   ([`UiModeState`])
//! - Resolving an item into streams plus optional enrichment
//!   ([`PlaybackResolver`])
//!
//! Selection and the state machine are pure and synchronous. Only the
//! resolver talks to a [`core_metadata::MetadataProvider`].

pub mod error;
pub mod mode;
pub mod resolver;
pub mod selection;
pub mod selector;
pub mod tracks;

pub use error::{PlaybackError, Result};
pub use mode::{BackgroundJobs, PlayMode, UiModeState};
pub use resolver::{PlaybackResolver, ResolvedPlayback};
pub use selection::StreamSelection;
pub use selector::{select_stream, StreamPreferences, StreamSelector};
pub use tracks::available_tracks;
