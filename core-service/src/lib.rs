//! Core service façade.
//!
//! Wires the host's [`MetadataProvider`] into the shared core:
//!
//! ```text
//! host provider -> CachedMetadataProvider -> PrefetchingProvider -> PlaybackResolver
//!                               ^                    |
//!                               +-- PrefetchOrchestrator (power aware)
//! ```
//!
//! Every read made through [`CoreService::provider`] or
//! [`CoreService::resolve`] warms the whole item in the background, and every
//! facet is loaded at most once per session until [`CoreService::flush`].
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use core_metadata::{ItemId, MetadataProvider};
//! # async fn example(host: Arc<dyn MetadataProvider>) -> core_service::Result<()> {
//! use core_playback::PlayMode;
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder()
//!     .preferred_languages(["en"])
//!     .build()?;
//! let core = CoreService::new(config, host).await?;
//!
//! let playback = core.resolve(&ItemId::new("item-1"), PlayMode::EmbeddedVideo).await?;
//! println!("playing {:?}", playback.selection.identifiers());
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_metadata::{
    CacheStats, CachedMetadataProvider, FlushOutcome, ItemId, MetadataProvider, PrefetchConfig,
    PrefetchOrchestrator, PrefetchingProvider, WarmupHandle,
};
use core_playback::{PlayMode, PlaybackResolver, ResolvedPlayback, StreamPreferences, StreamSelector};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
pub struct CoreService {
    config: CoreConfig,
    event_bus: EventBus,
    provider: Arc<PrefetchingProvider>,
    resolver: PlaybackResolver,
}

impl CoreService {
    /// Validates `config` and builds the caching, prefetching and resolving
    /// layers over `provider`.
    ///
    /// When `respect_power_saving` is set, prefetching follows the configured
    /// power monitor from here on.
    ///
    /// # Errors
    ///
    /// - [`CoreError::CapabilityMissing`] if a feature needs a missing capability
    /// - [`CoreError::Runtime`] if the configuration is invalid
    /// - [`CoreError::InitializationFailed`] if the power monitor cannot be
    ///   subscribed to
    #[instrument(skip_all)]
    pub async fn new(config: CoreConfig, provider: Arc<dyn MetadataProvider>) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let cache = Arc::new(
            CachedMetadataProvider::new(provider).with_event_bus(event_bus.clone()),
        );

        let prefetch_config = PrefetchConfig::default()
            .with_thumbnails(config.features.enable_thumbnail_prefetch)
            .with_max_concurrent_fetches(config.max_concurrent_prefetch);
        let orchestrator = Arc::new(
            PrefetchOrchestrator::new(cache, prefetch_config).with_event_bus(event_bus.clone()),
        );

        if !config.features.enable_prefetch {
            orchestrator.set_disabled(true);
        } else if config.features.respect_power_saving {
            let monitor = config.power_monitor.clone().ok_or_else(|| {
                CoreError::CapabilityMissing {
                    capability: "PowerMonitor".to_string(),
                    message: "respect_power_saving requires a power monitor".to_string(),
                }
            })?;
            orchestrator
                .bind_power_monitor(monitor)
                .await
                .map_err(|err| {
                    CoreError::InitializationFailed(format!(
                        "cannot follow power state: {}",
                        err
                    ))
                })?;
        }

        let provider = Arc::new(PrefetchingProvider::new(orchestrator));
        let selector = StreamSelector::new(StreamPreferences::from(&config));
        let resolver = PlaybackResolver::new(provider.clone(), selector)
            .with_event_bus(event_bus.clone());

        info!(
            prefetch = config.features.enable_prefetch,
            thumbnails = config.features.enable_thumbnail_prefetch,
            power_aware = config.features.respect_power_saving,
            "Core service initialized"
        );

        Ok(Self {
            config,
            event_bus,
            provider,
            resolver,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Cached, prefetching metadata provider.
    pub fn provider(&self) -> Arc<dyn MetadataProvider> {
        self.provider.clone()
    }

    pub fn prefetcher(&self) -> &Arc<PrefetchOrchestrator> {
        self.provider.orchestrator()
    }

    /// Selects streams for `item_id` and loads its enrichment.
    pub async fn resolve(&self, item_id: &ItemId, play_intent: PlayMode) -> Result<ResolvedPlayback> {
        Ok(self.resolver.resolve(item_id, play_intent).await?)
    }

    /// Warms `item_id` in the background. `None` if it was already warmed or
    /// prefetching is off.
    pub fn prefetch(&self, item_id: &ItemId) -> Option<WarmupHandle> {
        self.prefetcher().prefetch(item_id)
    }

    /// Drops every cached facet, cancels in-flight loads and forgets which
    /// items were warmed.
    pub fn flush(&self) -> FlushOutcome {
        self.provider.flush()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.prefetcher().cache().stats()
    }

    /// Subscribes to core events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .field("prefetcher", self.prefetcher())
            .finish_non_exhaustive()
    }
}
