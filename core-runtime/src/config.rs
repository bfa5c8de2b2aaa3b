//! # Core Configuration Module
//!
//! Configuration for the media player core.
//!
//! ## Overview
//!
//! A builder constructs a `CoreConfig` holding user stream preferences,
//! prefetch tuning and the optional host capabilities. Validation is
//! fail-fast: inconsistent settings are rejected at `build()` with a message
//! that says how to fix them.
//!
//! ## Optional Dependencies
//!
//! - `PowerMonitor` - Suspends prefetching while the device saves power
//!   (required when `respect_power_saving` is enabled)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .preferred_languages(["en", "de"])
//!     .preferred_audio_ids(["opus-160"])
//!     .max_concurrent_prefetch(8)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Power-saving awareness needs a PowerMonitor
//! let config = CoreConfig::builder()
//!     .respect_power_saving(true)
//!     .build()
//!     .expect("Should fail - missing PowerMonitor");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::PowerMonitor;
use std::sync::Arc;

/// Default number of thumbnail fetches a single warmup may run at once.
pub const DEFAULT_MAX_CONCURRENT_PREFETCH: usize = 4;

/// Upper bound for [`CoreConfig::max_concurrent_prefetch`].
pub const MAX_CONCURRENT_PREFETCH_LIMIT: usize = 64;

/// Core configuration for the media player core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Language tags in order of preference (e.g. `["en", "de"]`)
    pub preferred_languages: Vec<String>,

    /// Video stream identifiers in order of preference
    pub preferred_video_ids: Vec<String>,

    /// Audio stream identifiers in order of preference
    pub preferred_audio_ids: Vec<String>,

    pub features: FeatureFlags,

    /// Maximum concurrent thumbnail fetches per warmup
    pub max_concurrent_prefetch: usize,

    /// Capacity of the event bus broadcast channel
    pub event_buffer_size: usize,

    /// Power state monitor (optional)
    pub power_monitor: Option<Arc<dyn PowerMonitor>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("preferred_languages", &self.preferred_languages)
            .field("preferred_video_ids", &self.preferred_video_ids)
            .field("preferred_audio_ids", &self.preferred_audio_ids)
            .field("features", &self.features)
            .field("max_concurrent_prefetch", &self.max_concurrent_prefetch)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "power_monitor",
                &self.power_monitor.as_ref().map(|_| "PowerMonitor { ... }"),
            )
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Warm metadata caches when an item is first read
    pub enable_prefetch: bool,

    /// Include preview thumbnails in warmups
    pub enable_thumbnail_prefetch: bool,

    /// Suspend prefetching while the device is in power-saving mode
    /// (requires PowerMonitor)
    pub respect_power_saving: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_prefetch: true,
            enable_thumbnail_prefetch: true,
            respect_power_saving: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Prefetch concurrency is within `1..=64`
    /// - Event buffer is not empty
    /// - Preference lists contain no blank entries
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_prefetch == 0 {
            return Err(Error::Config(
                "max_concurrent_prefetch must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_prefetch > MAX_CONCURRENT_PREFETCH_LIMIT {
            return Err(Error::Config(format!(
                "max_concurrent_prefetch exceeds maximum of {}",
                MAX_CONCURRENT_PREFETCH_LIMIT
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than 0".to_string(),
            ));
        }

        for (name, list) in [
            ("preferred_languages", &self.preferred_languages),
            ("preferred_video_ids", &self.preferred_video_ids),
            ("preferred_audio_ids", &self.preferred_audio_ids),
        ] {
            if list.iter().any(|entry| entry.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "{} cannot contain empty entries",
                    name
                )));
            }
        }

        if self.features.respect_power_saving && self.power_monitor.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "PowerMonitor".to_string(),
                message: "Power-saving awareness enabled but no PowerMonitor provided. \
                          Disable respect_power_saving or inject a PowerMonitor implementation."
                    .to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    preferred_languages: Vec<String>,
    preferred_video_ids: Vec<String>,
    preferred_audio_ids: Vec<String>,
    features: FeatureFlags,
    max_concurrent_prefetch: Option<usize>,
    event_buffer_size: Option<usize>,
    power_monitor: Option<Arc<dyn PowerMonitor>>,
}

impl CoreConfigBuilder {
    /// Sets the preferred languages, most preferred first.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .preferred_languages(["en", "es"]);
    /// ```
    pub fn preferred_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the preferred video stream identifiers, most preferred first.
    pub fn preferred_video_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_video_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the preferred audio stream identifiers, most preferred first.
    pub fn preferred_audio_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_audio_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables cache warming.
    ///
    /// Default: true
    pub fn enable_prefetch(mut self, enabled: bool) -> Self {
        self.features.enable_prefetch = enabled;
        self
    }

    /// Enables or disables preview thumbnail warming.
    ///
    /// Default: true
    pub fn enable_thumbnail_prefetch(mut self, enabled: bool) -> Self {
        self.features.enable_thumbnail_prefetch = enabled;
        self
    }

    /// Suspends prefetching while the host reports power saving.
    ///
    /// Requires a `PowerMonitor` to be provided.
    ///
    /// Default: false
    pub fn respect_power_saving(mut self, enabled: bool) -> Self {
        self.features.respect_power_saving = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Sets the maximum number of concurrent thumbnail fetches per warmup.
    ///
    /// Default: 4
    pub fn max_concurrent_prefetch(mut self, limit: usize) -> Self {
        self.max_concurrent_prefetch = Some(limit);
        self
    }

    /// Sets the event bus channel capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the power monitor implementation (optional).
    pub fn power_monitor(mut self, monitor: Arc<dyn PowerMonitor>) -> Self {
        self.power_monitor = Some(monitor);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns an error if:
    /// - Configuration values are out of range
    /// - Feature flags are inconsistent with available bridges
    pub fn build(self) -> Result<CoreConfig> {
        let config = CoreConfig {
            preferred_languages: self.preferred_languages,
            preferred_video_ids: self.preferred_video_ids,
            preferred_audio_ids: self.preferred_audio_ids,
            features: self.features,
            max_concurrent_prefetch: self
                .max_concurrent_prefetch
                .unwrap_or(DEFAULT_MAX_CONCURRENT_PREFETCH),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            power_monitor: self.power_monitor,
        };

        config.validate()?;

        Ok(config)
    }
}
