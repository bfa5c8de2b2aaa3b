//! # Metadata Module
//!
//! Fetches item metadata from the host's [`MetadataProvider`] and keeps it
//! warm for the player.
//!
//! ## Overview
//!
//! This module handles:
//! - The provider contract and the data model it returns
//! - Session-scoped caching with one load per key ([`KeyedCache`])
//! - Bucketed caching of seek-bar preview thumbnails ([`TimeQuantizedCache`])
//! - Warming every facet of an item on first touch ([`PrefetchOrchestrator`])
//!
//! ## Layering
//!
//! ```text
//! PrefetchingProvider -> CachedMetadataProvider -> host MetadataProvider
//!          |                      ^
//!          +-- PrefetchOrchestrator
//! ```
//!
//! Every layer implements [`MetadataProvider`], so callers can hold any of
//! them as `Arc<dyn MetadataProvider>`.

pub mod cache;
pub mod cached_provider;
pub mod delay;
pub mod error;
pub mod models;
pub mod prefetch;
pub mod provider;

pub use cache::{
    quantize, CacheEntry, CacheKey, CacheStats, FlushOutcome, KeyedCache, TimeQuantizedCache,
};
pub use cached_provider::CachedMetadataProvider;
pub use delay::DelayProvider;
pub use error::{MetadataError, Result};
pub use models::{
    Chapter, ItemId, MetaInfo, PreviewThumbnailsInfo, RepoInfo, Stream, StreamKind, StreamTrack,
    Subtitle, Thumbnail,
};
pub use prefetch::{
    PrefetchConfig, PrefetchOrchestrator, PrefetchingProvider, WarmupHandle, WarmupReport,
};
pub use provider::MetadataProvider;
