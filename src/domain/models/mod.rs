pub mod attempt;
pub mod config;
pub mod diagnostic;
pub mod error_category;
pub mod goal;
pub mod graph;
pub mod patch;
pub mod state;
pub mod sync;

pub use attempt::{
    attempt_id, pattern_key, success_rate, suggestion_slot_key, tactic_key, AttemptInput,
    AttemptRecord, AttemptResult, NodeHistory, PatternEntry, SuggestionEntry, SuggestionSlot,
};
pub use config::{Config, LoggingConfig, RankingConfig, RankingWeights, SchedulerConfig, StateConfig};
pub use diagnostic::{
    DerivationContext, Diagnostic, GoalHint, Position, Severity, SourceRange,
};
pub use error_category::ErrorCategory;
pub use goal::{Declaration, DeclarationKind, Goal, GoalStatus};
pub use graph::{DependencyGraph, GraphEdge, GraphNode, NodeKind, NodeStatus, ROOT_NODE_ID};
pub use patch::{apply_patches, Patch, PatchOp};
pub use state::{paths, FileState, ProofState};
pub use sync::SyncReason;
