//! Configuration management infrastructure
//!
//! Layers, lowest to highest precedence: built-in defaults,
//! `.proofsync/config.yaml`, `.proofsync/local.yaml`, then `PROOFSYNC_*`
//! environment variables (`__` separates nested keys). The merged result is
//! validated before use.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
