//! Proofsync - proof-state synchronization and tactic recommendation
//!
//! Proofsync keeps a derived model of an interactive-theorem-proving session
//! in step with the source text and compiler diagnostics. It derives goals
//! and a dependency graph per file, records tactic attempts, learns which
//! tactics resolve which error categories, and ranks suggestions for open
//! obligations.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Proof-state models, the patch protocol and ports
//! - **Service Layer** (`services`): Derivation and recommendation engines, the
//!   sync scheduler and the session facade
//! - **Infrastructure Layer** (`infrastructure`): Config, logging, state stores
//!   and the filesystem context loader
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! Engines are pure: they read a [`ProofState`] snapshot and return
//! [`Patch`]es. Only the session and the scheduler's runner commit patches.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use proofsync::{FsContextLoader, InMemoryStateStore, ProofSession, SyncReason};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let loader = Arc::new(FsContextLoader::new("."));
//!     let session = ProofSession::builder(Arc::new(InMemoryStateStore::new()), loader).build();
//!     session.schedule_sync("Main.lean", SyncReason::Save).await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AttemptInput, AttemptResult, Config, DependencyGraph, Diagnostic, ErrorCategory, Goal,
    GoalStatus, NodeStatus, Patch, PatchOp, ProofState, SuggestionEntry, SyncReason,
};
pub use domain::ports::{ContextLoader, GoalHintLoader, StateStore, TacticExecutor};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::context::FsContextLoader;
pub use infrastructure::state::{InMemoryStateStore, JsonFileStateStore};
pub use services::{
    classify, DerivationEngine, ProofSession, RecommendationEngine, ScheduleOptions, SyncScheduler,
};
