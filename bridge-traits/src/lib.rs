//! # Host Bridge Traits
//!
//! Platform capability contracts the media core consumes from its host.
//!
//! ## Overview
//!
//! The core never queries the OS power manager or the host's logging pipeline
//! directly. Each of those concerns is expressed here as a trait that the host
//! (or a test) implements and injects:
//!
//! - [`PowerMonitor`](power::PowerMonitor) - device power-saving state, used to
//!   suspend background prefetching
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to the host
//!
//! The metadata provider contract is domain-specific and lives in
//! `core-metadata` next to the caches that decorate it.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`: bridges are shared between foreground
//! reads and background tasks.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::power::{PowerMonitor, PowerState};
//!
//! async fn may_prefetch(monitor: &dyn PowerMonitor) -> bool {
//!     !monitor.is_power_saving().await
//! }
//! ```

pub mod error;
pub mod logging;
pub mod power;

pub use error::{BridgeError, Result};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use power::{PowerChangeStream, PowerMonitor, PowerState};
