use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{diagnostic, DerivationContext, GoalHint};
use crate::domain::ports::{ContextLoader, GoalHintLoader};

const DIAGNOSTICS_SUFFIX: &str = ".diagnostics.json";
const GOALS_SUFFIX: &str = ".goals.json";

/// Loads derivation context from files under a root directory
///
/// File keys are paths relative to the root (absolute keys are used as is).
#[derive(Debug, Clone)]
pub struct FsContextLoader {
    root: PathBuf,
}

impl FsContextLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn source_path(&self, file_key: &str) -> PathBuf {
        self.root.join(file_key)
    }

    fn sidecar_path(&self, file_key: &str, suffix: &str) -> PathBuf {
        self.root.join(format!("{file_key}{suffix}"))
    }

    /// Read a JSON sidecar. Missing files are `None`; unreadable or
    /// malformed files are logged and treated as missing.
    async fn read_sidecar(path: &Path) -> Option<Value> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "sidecar unreadable");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "sidecar is not valid JSON");
                None
            }
        }
    }
}

/// Sidecars may hold a bare array or an object wrapping it under `key`.
pub fn sidecar_list<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Array(_) => Some(value),
        Value::Object(map) => map.get(key),
        _ => None,
    }
}

#[async_trait]
impl ContextLoader for FsContextLoader {
    async fn load_context(&self, file_key: &str) -> DomainResult<DerivationContext> {
        if file_key.trim().is_empty() {
            return Err(DomainError::ValidationFailed("empty file key".to_string()));
        }

        let path = self.source_path(file_key);
        let source_text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| DomainError::ContextUnavailable {
                file_key: file_key.to_string(),
                reason: err.to_string(),
            })?;

        let sidecar = Self::read_sidecar(&self.sidecar_path(file_key, DIAGNOSTICS_SUFFIX)).await;
        let diagnostics = diagnostic::diagnostics_from_value(
            sidecar.as_ref().and_then(|v| sidecar_list(v, "diagnostics")),
        );

        tracing::debug!(
            file_key,
            bytes = source_text.len(),
            diagnostics = diagnostics.len(),
            "context loaded"
        );

        Ok(DerivationContext::new(file_key, source_text).with_diagnostics(diagnostics))
    }
}

#[async_trait]
impl GoalHintLoader for FsContextLoader {
    async fn load_hints(&self, file_key: &str) -> DomainResult<Vec<GoalHint>> {
        let path = self.sidecar_path(file_key, GOALS_SUFFIX);
        let Some(sidecar) = Self::read_sidecar(&path).await else {
            return Err(DomainError::HintsUnavailable(file_key.to_string()));
        };
        Ok(diagnostic::hints_from_value(sidecar_list(&sidecar, "goalHints")))
    }
}
