//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - ContextLoader: source text + diagnostics for a file key
//! - GoalHintLoader: optional goal-text hints from the editor
//! - TacticExecutor: runs a tactic against an obligation
//! - StateStore: commits patches and serves snapshots
//!
//! These traits keep the engines independent of the editor host and of the
//! persistent store.

pub mod context_loader;
pub mod state_store;
pub mod tactic_executor;

pub use context_loader::{ContextLoader, GoalHintLoader};
pub use state_store::StateStore;
pub use tactic_executor::{ExecutorOutcome, TacticExecutor, TacticRequest};
