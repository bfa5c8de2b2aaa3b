//! Workspace umbrella crate.
//!
//! Exposes feature flags that map to the individual workspace crates so a host
//! application can depend on `media-core-workspace` alone:
//!
//! - `service` (default): the full [`core_service`] façade
//! - `metadata-only`: just the caching/prefetching layer from `core-metadata`
//! - `playback-only`: just the stream selector and mode state machine from
//!   `core-playback`

#[cfg(feature = "service")]
pub use core_service;

#[cfg(feature = "metadata-only")]
pub use core_metadata;

#[cfg(feature = "playback-only")]
pub use core_playback;
