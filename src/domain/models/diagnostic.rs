//! Diagnostic and derivation-context models.
//!
//! Editors hand us loosely-typed JSON. Everything in this module converts
//! that JSON into the fixed tagged types the engines work on, dropping any
//! entry that does not conform instead of letting it reach engine logic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a compiler diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Hint => "hint",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" | "information" => Some(Self::Info),
            "hint" => Some(Self::Hint),
            _ => None,
        }
    }

    /// LSP `DiagnosticSeverity` numeric codes.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Info),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// A 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// A source range. Lines are 1-based and `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    /// Build a range, rejecting line 0 and inverted ranges.
    pub fn new(start: Position, end: Position) -> Option<Self> {
        if start.line == 0 || end.line == 0 || end < start {
            return None;
        }
        Some(Self { start, end })
    }

    /// Range covering whole lines `start_line..=end_line`.
    pub fn lines(start_line: u32, end_line: u32) -> Option<Self> {
        Self::new(
            Position { line: start_line, column: 1 },
            Position { line: end_line, column: 1 },
        )
    }

    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start.line && line <= self.end.line
    }
}

/// A compiler diagnostic attached to a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub range: SourceRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, line: u32) -> Self {
        Self::at(message, Severity::Error, line)
    }

    pub fn at(message: impl Into<String>, severity: Severity, line: u32) -> Self {
        let position = Position { line: line.max(1), column: 1 };
        Self {
            message: message.into(),
            severity,
            range: SourceRange { start: position, end: position },
            source: None,
        }
    }

    pub fn line(&self) -> u32 {
        self.range.start.line
    }

    /// Convert an untyped payload into a diagnostic.
    ///
    /// Accepts the LSP shape (`range.start.line`, 0-based, numeric severity)
    /// and a flat shape (`line`/`endLine`, 1-based, named severity). Returns
    /// `None` for anything that does not conform.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let message = object.get("message")?.as_str()?.trim();
        if message.is_empty() {
            return None;
        }

        let severity = match object.get("severity") {
            Some(Value::String(s)) => Severity::from_str(s)?,
            Some(Value::Number(n)) => Severity::from_code(n.as_u64()?)?,
            None => Severity::Error,
            Some(_) => return None,
        };

        let range = match object.get("range") {
            Some(range) => parse_lsp_range(range)?,
            None => parse_flat_range(object)?,
        };

        let source = object
            .get("source")
            .or_else(|| object.get("code"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Some(Self {
            message: message.to_string(),
            severity,
            range,
            source,
        })
    }
}

fn read_u32(value: Option<&Value>) -> Option<u32> {
    value?.as_u64().and_then(|n| u32::try_from(n).ok())
}

/// LSP positions are 0-based; shift to 1-based.
fn parse_lsp_range(range: &Value) -> Option<SourceRange> {
    let start = range.get("start")?;
    let end = range.get("end").unwrap_or(start);
    let position = |p: &Value| -> Option<Position> {
        Some(Position {
            line: read_u32(p.get("line"))?.checked_add(1)?,
            column: read_u32(p.get("character").or_else(|| p.get("column")))
                .unwrap_or(0)
                .saturating_add(1),
        })
    };
    SourceRange::new(position(start)?, position(end)?)
}

fn parse_flat_range(object: &serde_json::Map<String, Value>) -> Option<SourceRange> {
    let line = read_u32(object.get("line"))?;
    let end_line = read_u32(object.get("endLine").or_else(|| object.get("end_line"))).unwrap_or(line);
    let column = read_u32(object.get("column")).unwrap_or(1).max(1);
    let end_column = read_u32(object.get("endColumn").or_else(|| object.get("end_column")))
        .unwrap_or(column)
        .max(1);
    SourceRange::new(
        Position { line, column },
        Position { line: end_line, column: end_column },
    )
}

/// Extra goal text reported by the editor for a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalHint {
    pub line: u32,
    pub goal_text: String,
}

impl GoalHint {
    pub fn from_value(value: &Value) -> Option<Self> {
        let line = read_u32(value.get("line"))?;
        let goal_text = value
            .get("goalText")
            .or_else(|| value.get("goal_text"))
            .or_else(|| value.get("goal"))?
            .as_str()?
            .trim();
        if line == 0 || goal_text.is_empty() {
            return None;
        }
        Some(Self {
            line,
            goal_text: goal_text.to_string(),
        })
    }
}

/// Everything the derivation engine needs about one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationContext {
    pub file_key: String,
    pub source_text: String,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub goal_hints: Vec<GoalHint>,
}

impl DerivationContext {
    pub fn new(file_key: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            file_key: file_key.into(),
            source_text: source_text.into(),
            diagnostics: Vec::new(),
            goal_hints: Vec::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_goal_hints(mut self, hints: Vec<GoalHint>) -> Self {
        self.goal_hints = hints;
        self
    }

    /// Convert an untyped context payload. A missing file key rejects the
    /// whole payload; malformed diagnostics and hints are dropped one by one.
    pub fn from_value(value: &Value) -> Option<Self> {
        let file_key = value
            .get("fileKey")
            .or_else(|| value.get("file_key"))?
            .as_str()?
            .trim();
        if file_key.is_empty() {
            return None;
        }
        let source_text = value
            .get("sourceText")
            .or_else(|| value.get("source_text"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        Some(Self {
            file_key: file_key.to_string(),
            source_text: source_text.to_string(),
            diagnostics: diagnostics_from_value(value.get("diagnostics")),
            goal_hints: hints_from_value(value.get("goalHints").or_else(|| value.get("goal_hints"))),
        })
    }
}

/// Validate a JSON array of diagnostics, dropping entries that do not conform.
pub fn diagnostics_from_value(value: Option<&Value>) -> Vec<Diagnostic> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Diagnostic::from_value).collect())
        .unwrap_or_default()
}

/// Validate a JSON array of goal hints, dropping entries that do not conform.
pub fn hints_from_value(value: Option<&Value>) -> Vec<GoalHint> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(GoalHint::from_value).collect())
        .unwrap_or_default()
}
