pub mod derivation;
pub mod error_classifier;
pub mod goal_signature;
pub mod proof_session;
pub mod recommendation;
pub mod sync_scheduler;

pub use derivation::{derivation_patches, Derivation, DerivationEngine};
pub use error_classifier::classify;
pub use goal_signature::goal_signature;
pub use proof_session::{normalize_outcome, AppliedTactic, NormalizedOutcome, ProofSession, ProofSessionBuilder};
pub use recommendation::RecommendationEngine;
pub use sync_scheduler::{Phase, PostRunTask, ScheduleOptions, SyncRunner, SyncScheduler};
