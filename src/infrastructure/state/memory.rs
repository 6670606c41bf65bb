use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{apply_patches, Patch, ProofState};
use crate::domain::ports::StateStore;

/// Process-local state tree
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    tree: RwLock<Value>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing tree
    pub fn with_tree(tree: Value) -> Self {
        Self {
            tree: RwLock::new(tree),
        }
    }

    /// Copy of the raw tree
    pub async fn tree(&self) -> Value {
        self.tree.read().await.clone()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn snapshot(&self) -> DomainResult<ProofState> {
        Ok(ProofState::from_value(&*self.tree.read().await))
    }

    async fn apply(&self, patches: &[Patch]) -> DomainResult<()> {
        let mut tree = self.tree.write().await;
        apply_patches(&mut tree, patches);
        tracing::trace!(patches = patches.len(), "patches applied in memory");
        Ok(())
    }
}
