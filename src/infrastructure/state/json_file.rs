use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::errors::StateError;
use crate::domain::errors::DomainResult;
use crate::domain::models::{apply_patches, Patch, ProofState};
use crate::domain::ports::StateStore;

/// State tree persisted as one JSON document
///
/// Every `apply` reads the file, applies the patches, and writes it back
/// through a temp file and rename. A missing file is an empty tree.
#[derive(Debug)]
pub struct JsonFileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw tree as stored on disk
    pub async fn read_tree(&self) -> Result<Value, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Value::Null),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_tree(&self, tree: &Value) -> Result<(), StateError> {
        let content = serde_json::to_vec_pretty(tree)?;
        let write_err = |source| StateError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, content).await.map_err(write_err)?;
        if let Err(source) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(source));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn snapshot(&self) -> DomainResult<ProofState> {
        let tree = self.read_tree().await?;
        Ok(ProofState::from_value(&tree))
    }

    async fn apply(&self, patches: &[Patch]) -> DomainResult<()> {
        if patches.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut tree = self.read_tree().await?;
        apply_patches(&mut tree, patches);
        self.write_tree(&tree).await?;
        tracing::debug!(path = %self.path.display(), patches = patches.len(), "state file updated");
        Ok(())
    }
}
