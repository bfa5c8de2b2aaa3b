//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by every core crate:
//! - Logging and tracing setup
//! - Configuration (`CoreConfig` builder with fail-fast validation)
//! - Event bus used as the side channel for non-fatal failures
//!
//! ## Overview
//!
//! Nothing in here knows about streams or caches. Domain crates depend on this
//! one for their logging conventions, their configuration values and the
//! [`events::EventBus`] they report through.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
