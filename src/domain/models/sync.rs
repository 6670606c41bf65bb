//! Sync trigger reasons.

use serde::{Deserialize, Serialize};

/// Why a re-derivation was requested. Each reason has its own debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncReason {
    /// Initial load of a file
    Startup,
    /// Editor focused the file
    Activate,
    /// File saved
    Save,
    /// Compiler published new diagnostics
    Diagnostics,
    /// A tactic was applied programmatically
    Apply,
}

impl SyncReason {
    pub const ALL: [Self; 5] = [
        Self::Startup,
        Self::Activate,
        Self::Save,
        Self::Diagnostics,
        Self::Apply,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Activate => "activate",
            Self::Save => "save",
            Self::Diagnostics => "diagnostics",
            Self::Apply => "apply",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim().to_lowercase())
    }
}

impl std::fmt::Display for SyncReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
