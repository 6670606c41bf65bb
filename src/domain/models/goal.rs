//! Goal and declaration domain models.
//!
//! Goals are recomputed wholesale on every derivation pass. The only
//! continuity between passes is the goal id, which depends on nothing but
//! the declaration start line and the normalized statement.

use serde::{Deserialize, Serialize};

/// Status of a proof obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Still has a `sorry` or a pending body
    Open,
    /// Elaborated without errors
    Resolved,
    /// Carries an error diagnostic
    Failed,
}

impl Default for GoalStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A proof obligation with a stable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub statement: String,
    pub status: GoalStatus,
    /// Goal text reported by the editor, when a hint covered this block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_text: Option<String>,
}

impl Goal {
    /// Text used for goal-signature matching: the editor's goal text when
    /// known, otherwise the declared statement.
    pub fn matching_text(&self) -> &str {
        self.goal_text.as_deref().unwrap_or(&self.statement)
    }
}

/// Kind of top-level declaration recognised by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Theorem,
    Lemma,
    Example,
    Definition,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Theorem => "theorem",
            Self::Lemma => "lemma",
            Self::Example => "example",
            Self::Definition => "definition",
        }
    }

    /// Map a source keyword to a declaration kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "theorem" => Some(Self::Theorem),
            "lemma" => Some(Self::Lemma),
            "example" => Some(Self::Example),
            "def" | "definition" => Some(Self::Definition),
            _ => None,
        }
    }

    /// Whether declarations of this kind carry a proof obligation.
    pub fn is_proof(&self) -> bool {
        !matches!(self, Self::Definition)
    }
}

/// A top-level declaration block in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub start_line: u32,
    /// Next declaration's start line minus one, or the last line of the file.
    pub end_line: u32,
    pub kind: DeclarationKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    pub is_proof: bool,
    /// False when no `:=` separator was found (body pending).
    pub has_body: bool,
}

impl Declaration {
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}
