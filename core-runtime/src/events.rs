//! # Event Bus System
//!
//! Side channel for observable core activity, built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Typed enums per domain (metadata cache, prefetch, playback)
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! Nothing in the core depends on anyone listening. Emitting with no
//! subscribers returns an error that callers ignore.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   emit    ┌───────────┐
//! │ Metadata cache ├──────────>│           │
//! └────────────────┘           │           │
//!                              │ EventBus  │   subscribe   ┌────────────┐
//! ┌────────────────┐   emit    │ (broadcast├──────────────>│ Subscriber │
//! │ Prefetcher     ├──────────>│  channel) │               └────────────┘
//! └────────────────┘           │           │
//!                              │           │
//! ┌────────────────┐   emit    │           │
//! │ Resolver       ├──────────>│           │
//! └────────────────┘           └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Playback(PlaybackEvent::EnrichmentFailed {
//!         item_id: "item-1".to_string(),
//!         facet: "subtitles".to_string(),
//!         message: "provider unavailable".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Optional metadata could not be loaded");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Metadata cache events
    Metadata(MetadataEvent),
    /// Cache warming events
    Prefetch(PrefetchEvent),
    /// Stream resolution events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Metadata(e) => e.description(),
            CoreEvent::Prefetch(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::ResolutionFailed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::EnrichmentFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Metadata(MetadataEvent::LoadFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Prefetch(PrefetchEvent::WarmupCompleted { failed, .. }) if *failed > 0 => {
                EventSeverity::Warning
            }
            CoreEvent::Metadata(MetadataEvent::CacheFlushed { .. }) => EventSeverity::Info,
            CoreEvent::Prefetch(PrefetchEvent::SuspendedChanged { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::StreamSelected { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Metadata Events
// ============================================================================

/// Events emitted by the metadata caches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum MetadataEvent {
    /// All caches were cleared.
    CacheFlushed {
        /// Stored entries that were dropped.
        entries_cleared: usize,
        /// In-flight loads that were aborted.
        loads_cancelled: usize,
    },
    /// A provider call failed. The failure was handed to every waiter and
    /// nothing was stored.
    LoadFailed {
        /// Display form of the cache key.
        key: String,
        /// Human-readable error message.
        message: String,
    },
}

impl MetadataEvent {
    fn description(&self) -> &str {
        match self {
            MetadataEvent::CacheFlushed { .. } => "Metadata cache flushed",
            MetadataEvent::LoadFailed { .. } => "Metadata load failed",
        }
    }
}

// ============================================================================
// Prefetch Events
// ============================================================================

/// Events emitted while warming caches ahead of use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PrefetchEvent {
    /// Warming of an item was kicked off.
    WarmupStarted {
        item_id: String,
        /// Number of facet fetches issued.
        tasks: usize,
    },
    /// Every facet fetch of a warmup has settled.
    WarmupCompleted {
        item_id: String,
        succeeded: usize,
        failed: usize,
    },
    /// Warming was switched off or back on (power saving, explicit toggle).
    SuspendedChanged {
        suspended: bool,
    },
}

impl PrefetchEvent {
    fn description(&self) -> &str {
        match self {
            PrefetchEvent::WarmupStarted { .. } => "Cache warmup started",
            PrefetchEvent::WarmupCompleted { .. } => "Cache warmup completed",
            PrefetchEvent::SuspendedChanged { suspended: true } => "Prefetching suspended",
            PrefetchEvent::SuspendedChanged { suspended: false } => "Prefetching resumed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted while resolving an item for playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Streams were chosen for an item.
    StreamSelected {
        item_id: String,
        /// Identifiers of the chosen streams, primary first.
        stream_ids: Vec<String>,
        /// Whether separate video and audio streams are muxed at playback.
        demuxed: bool,
    },
    /// Optional metadata (title, subtitles, chapters) could not be loaded.
    /// Playback proceeds without it.
    EnrichmentFailed {
        item_id: String,
        /// Which facet failed (e.g. "subtitles").
        facet: String,
        message: String,
    },
    /// The item cannot be played.
    ResolutionFailed {
        item_id: String,
        message: String,
        /// Whether retrying may help.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StreamSelected { .. } => "Stream selected",
            PlaybackEvent::EnrichmentFailed { .. } => "Optional metadata could not be loaded",
            PlaybackEvent::ResolutionFailed { .. } => "Playback resolution failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A subscriber that falls behind by more than `capacity` events receives
    /// `RecvError::Lagged`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. `CoreConfig` rejects a zero buffer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let problems = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
