//! State commit port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Patch, ProofState};

/// External state owner. Engines read snapshots and hand back patches.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current immutable snapshot.
    async fn snapshot(&self) -> DomainResult<ProofState>;

    /// Apply patches atomically, in order.
    async fn apply(&self, patches: &[Patch]) -> DomainResult<()>;
}
