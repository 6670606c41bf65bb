//! Tactic execution port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::AttemptResult;

/// Request to run a tactic against one obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticRequest {
    pub file_key: String,
    pub node_id: String,
    pub tactic: String,
    pub tactic_key: String,
}

/// Raw executor response. `result` and `error_message` are optional and
/// get normalized before anything is recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorOutcome {
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AttemptResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Runs tactics. This crate never executes tactics itself.
#[async_trait]
pub trait TacticExecutor: Send + Sync {
    async fn apply(&self, request: TacticRequest) -> DomainResult<ExecutorOutcome>;
}
