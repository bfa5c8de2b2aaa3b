//! Power State Monitoring Abstraction
//!
//! Reports whether the device is in a power-saving mode so that the core can
//! stop speculative network work (prefetching) while it is.

use async_trait::async_trait;

use crate::error::Result;

/// Device power state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Normal operation, background work allowed
    Normal,
    /// OS battery saver / low power mode is active
    PowerSaving,
    /// Host could not determine the state
    Unknown,
}

impl PowerState {
    /// Returns `true` if background work should be suspended.
    ///
    /// `Unknown` is treated as normal operation.
    pub fn is_power_saving(&self) -> bool {
        matches!(self, PowerState::PowerSaving)
    }
}

/// Power monitor trait
///
/// # Platform Support
///
/// - **Android**: `PowerManager.isPowerSaveMode` + `ACTION_POWER_SAVE_MODE_CHANGED`
/// - **iOS**: `ProcessInfo.isLowPowerModeEnabled`
/// - **Desktop**: usually always `Normal`
///
/// # Example
///
/// ```ignore
/// use bridge_traits::power::PowerMonitor;
///
/// async fn watch(monitor: &dyn PowerMonitor) -> bridge_traits::Result<()> {
///     let mut changes = monitor.subscribe_changes().await?;
///     while let Some(state) = changes.next().await {
///         println!("power state: {:?}", state);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait PowerMonitor: Send + Sync {
    /// Get the current power state
    async fn get_power_state(&self) -> Result<PowerState>;

    /// Check if power saving is currently active.
    ///
    /// Errors are reported as "not saving".
    async fn is_power_saving(&self) -> bool {
        matches!(self.get_power_state().await, Ok(PowerState::PowerSaving))
    }

    /// Subscribe to power state changes
    ///
    /// Implementations should emit an update whenever the state changes.
    async fn subscribe_changes(&self) -> Result<Box<dyn PowerChangeStream>>;
}

/// Stream of power state changes
#[async_trait]
pub trait PowerChangeStream: Send {
    /// Get the next power state update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<PowerState>;
}
