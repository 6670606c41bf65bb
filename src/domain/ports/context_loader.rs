//! Context loading ports.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DerivationContext, GoalHint};

/// Supplies the source snapshot and diagnostics for a file.
#[async_trait]
pub trait ContextLoader: Send + Sync {
    /// Load the current context for `file_key`.
    ///
    /// The returned context has no goal hints; those come from
    /// [`GoalHintLoader`].
    async fn load_context(&self, file_key: &str) -> DomainResult<DerivationContext>;
}

/// Supplies optional goal-text hints used to sharpen goal-signature matching.
#[async_trait]
pub trait GoalHintLoader: Send + Sync {
    async fn load_hints(&self, file_key: &str) -> DomainResult<Vec<GoalHint>>;
}
