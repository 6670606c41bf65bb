//! Failure taxonomy for compiler and tactic error messages.

use serde::{Deserialize, Serialize};

/// Fixed category a failure message is classified into.
///
/// Variant order mirrors classifier rule precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    UnknownIdentifier,
    TypeMismatch,
    TacticFailed,
    UnsolvedGoals,
    KernelError,
    SyntaxError,
    Other,
}

impl Default for ErrorCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl ErrorCategory {
    /// Every category, in rule precedence order.
    pub const ALL: [Self; 8] = [
        Self::Timeout,
        Self::UnknownIdentifier,
        Self::TypeMismatch,
        Self::TacticFailed,
        Self::UnsolvedGoals,
        Self::KernelError,
        Self::SyntaxError,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::UnknownIdentifier => "unknown_identifier",
            Self::TypeMismatch => "type_mismatch",
            Self::TacticFailed => "tactic_failed",
            Self::UnsolvedGoals => "unsolved_goals",
            Self::KernelError => "kernel_error",
            Self::SyntaxError => "syntax_error",
            Self::Other => "other",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|c| c.as_str() == normalized)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
