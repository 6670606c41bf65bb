//! CLI command implementations.

pub mod classify;
pub mod derive;
pub mod record;
pub mod suggest;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::models::Config;
use crate::infrastructure::context::FsContextLoader;
use crate::infrastructure::state::JsonFileStateStore;
use crate::services::ProofSession;

/// Adapters shared by every command: the JSON state file and the
/// filesystem context loader rooted at the working directory.
pub struct Workspace {
    pub config: Config,
    pub store: Arc<JsonFileStateStore>,
    pub loader: Arc<FsContextLoader>,
}

impl Workspace {
    pub fn open(config: Config, state_override: Option<PathBuf>) -> Self {
        let state_path = state_override.unwrap_or_else(|| PathBuf::from(&config.state.path));
        Self {
            store: Arc::new(JsonFileStateStore::new(state_path)),
            loader: Arc::new(FsContextLoader::new(".")),
            config,
        }
    }

    pub fn session(&self) -> ProofSession {
        ProofSession::builder(self.store.clone(), self.loader.clone())
            .goal_hints(self.loader.clone())
            .config(&self.config)
            .build()
    }
}
