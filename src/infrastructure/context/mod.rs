//! Filesystem context adapter
//!
//! Reads source text from disk, plus optional JSON sidecars written by the
//! editor integration:
//! - `<file>.diagnostics.json`: diagnostics (LSP or flat shape)
//! - `<file>.goals.json`: goal hints `{line, goalText}`

pub mod fs_loader;

pub use fs_loader::{sidecar_list, FsContextLoader};
