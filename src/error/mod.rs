//! The unified error handling system for the crate.
//!
//! Two kinds of failure live here. [`SlotError`] is the misuse signal raised
//! when a request was never configured by [`crate::catch::CatchLayer`];
//! [`ConfigError`] covers loading the TOML configuration. Errors recorded by
//! handlers themselves are opaque [`SharedError`] values and never pass
//! through this module.

use std::sync::Arc;

// 1. Core Types
pub use config::ConfigError;
pub use slot::SlotError;
pub use types::Error;

/// A unified `Result` type for the crate's own fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Owned, type-erased error accepted by the slot accessors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error value held by an [`crate::slot::ErrorSlot`].
///
/// Shared so that [`crate::slot::get`] can hand out the recorded value
/// without taking it out of the slot.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

// 2. Module declarations
pub mod config;
pub mod slot;
pub mod types;
