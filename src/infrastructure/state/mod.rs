//! State store adapters
//!
//! Both adapters hold the raw JSON state tree, apply patches in order under
//! a lock, and serve typed [`ProofState`](crate::domain::models::ProofState)
//! snapshots.

pub mod errors;
pub mod json_file;
pub mod memory;

pub use errors::StateError;
pub use json_file::JsonFileStateStore;
pub use memory::InMemoryStateStore;
