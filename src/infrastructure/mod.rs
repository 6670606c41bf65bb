//! Infrastructure layer module
//!
//! Adapters and ambient services behind the domain ports:
//! - Configuration management (figment)
//! - Filesystem context loading
//! - Logging infrastructure
//! - State persistence (JSON file, in-memory)
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod context;
pub mod logging;
pub mod state;
