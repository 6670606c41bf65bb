//! Line-oriented declaration scanner.
//!
//! Works on comment-stripped source so commented-out declarations and
//! `sorry`s never count. Line numbers are 1-based and match the original
//! source because comment stripping preserves newlines.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::models::{Declaration, DeclarationKind};
use crate::services::goal_signature::normalize_statement;

fn header_regex() -> Option<&'static Regex> {
    static HEADER: OnceLock<Option<Regex>> = OnceLock::new();
    HEADER
        .get_or_init(|| {
            Regex::new(
                r"^\s*(?:@\[[^\]]*\]\s*)*(?:(?:private|protected|noncomputable|partial|unsafe|nonrec)\s+)*(theorem|lemma|example|def|definition)\b",
            )
            .map_err(|err| tracing::error!(error = %err, "invalid declaration header pattern"))
            .ok()
        })
        .as_ref()
}

fn sorry_regex() -> Option<&'static Regex> {
    static SORRY: OnceLock<Option<Regex>> = OnceLock::new();
    SORRY
        .get_or_init(|| {
            Regex::new(r"\bsorry\b")
                .map_err(|err| tracing::error!(error = %err, "invalid sorry pattern"))
                .ok()
        })
        .as_ref()
}

/// A declaration plus the stripped text of its block.
#[derive(Debug, Clone)]
pub struct ScannedBlock {
    pub declaration: Declaration,
    pub text: String,
}

impl ScannedBlock {
    /// Whether the block still contains an open-obligation marker.
    pub fn has_sorry(&self) -> bool {
        sorry_regex().is_some_and(|re| re.is_match(&self.text))
    }
}

/// Scan comment-stripped source into declaration blocks.
///
/// Each header starts a block that runs until the line before the next
/// header, or to the end of the file.
pub fn scan(stripped_source: &str) -> Vec<ScannedBlock> {
    let Some(header) = header_regex() else {
        return Vec::new();
    };

    let lines: Vec<&str> = stripped_source.lines().collect();
    let total_lines = u32::try_from(lines.len()).unwrap_or(u32::MAX);

    let starts: Vec<(usize, DeclarationKind, usize)> = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let captures = header.captures(line)?;
            let keyword = captures.get(1)?;
            let kind = DeclarationKind::from_keyword(keyword.as_str())?;
            Some((idx, kind, keyword.end()))
        })
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &(idx, kind, keyword_end))| {
            let end_idx = starts.get(i + 1).map_or(lines.len(), |next| next.0);
            let start_line = line_number(idx);
            let end_line = if end_idx == lines.len() {
                total_lines.max(start_line)
            } else {
                line_number(end_idx - 1).max(start_line)
            };

            let text = lines[idx..end_idx].join("\n");
            let after_keyword = &text[keyword_end..];
            let (label, rest) = split_label(after_keyword);
            let label = match (kind, label) {
                (DeclarationKind::Example, _) | (_, None) => format!("{}@{start_line}", kind.as_str()),
                (_, Some(name)) => name.to_string(),
            };

            let header = parse_header(rest);
            let statement = if kind.is_proof() { header.statement } else { None };

            ScannedBlock {
                declaration: Declaration {
                    start_line,
                    end_line,
                    kind,
                    label,
                    statement,
                    is_proof: kind.is_proof(),
                    has_body: header.has_body,
                },
                text,
            }
        })
        .collect()
}

fn line_number(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}

/// Split the declaration name off the text after the keyword.
fn split_label(after_keyword: &str) -> (Option<&str>, &str) {
    let trimmed = after_keyword.trim_start();
    let name_len = trimmed
        .find(|c: char| c.is_whitespace() || matches!(c, ':' | '(' | '{' | '[' | '⦃'))
        .unwrap_or(trimmed.len());
    if name_len == 0 {
        (None, trimmed)
    } else {
        (Some(&trimmed[..name_len]), &trimmed[name_len..])
    }
}

struct Header {
    statement: Option<String>,
    has_body: bool,
}

/// Find the type-ascription colon and the `:=` body separator at bracket
/// depth zero. Without a separator the statement runs to the end of the
/// block and the body is pending.
fn parse_header(rest: &str) -> Header {
    let mut depth: i32 = 0;
    let mut colon: Option<usize> = None;
    let mut separator: Option<usize> = None;

    let mut chars = rest.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '(' | '[' | '{' | '⟨' | '⦃' => depth += 1,
            ')' | ']' | '}' | '⟩' | '⦄' => depth = (depth - 1).max(0),
            ':' if depth == 0 => {
                if chars.peek().is_some_and(|&(_, next)| next == '=') {
                    separator = Some(idx);
                    break;
                }
                if colon.is_none() {
                    colon = Some(idx);
                }
            }
            _ => {}
        }
    }

    let statement = colon.map(|start| {
        let end = separator.unwrap_or(rest.len());
        normalize_statement(&rest[start + 1..end])
    });

    Header {
        statement: statement.filter(|s| !s.is_empty()),
        has_body: separator.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::goal_signature::strip_comments;

    const SOURCE: &str = "\
import Mathlib

theorem add_comm' (a b : Nat) : a + b = b + a := by
  omega

lemma needs_work (n : Nat) :
    n * 1 = n := by
  sorry

def double (n : Nat) : Nat := 2 * n

example : 1 + 1 = 2 := rfl
theorem pending : True
";

    fn blocks() -> Vec<ScannedBlock> {
        scan(&strip_comments(SOURCE))
    }

    #[test]
    fn test_block_boundaries() {
        let blocks = blocks();
        let spans: Vec<(u32, u32)> = blocks
            .iter()
            .map(|b| (b.declaration.start_line, b.declaration.end_line))
            .collect();
        assert_eq!(spans, vec![(3, 5), (6, 9), (10, 11), (12, 12), (13, 13)]);
    }

    #[test]
    fn test_labels_and_kinds() {
        let blocks = blocks();
        let labels: Vec<&str> = blocks.iter().map(|b| b.declaration.label.as_str()).collect();
        assert_eq!(labels, vec!["add_comm'", "needs_work", "double", "example@12", "pending"]);
        assert_eq!(blocks[2].declaration.kind, DeclarationKind::Definition);
        assert!(!blocks[2].declaration.is_proof);
    }

    #[test]
    fn test_statements() {
        let blocks = blocks();
        assert_eq!(blocks[0].declaration.statement.as_deref(), Some("a + b = b + a"));
        assert_eq!(blocks[1].declaration.statement.as_deref(), Some("n * 1 = n"));
        assert_eq!(blocks[2].declaration.statement, None);
        assert_eq!(blocks[3].declaration.statement.as_deref(), Some("1 + 1 = 2"));
        assert_eq!(blocks[4].declaration.statement.as_deref(), Some("True"));
    }

    #[test]
    fn test_body_detection() {
        let blocks = blocks();
        assert!(blocks[0].declaration.has_body);
        assert!(!blocks[4].declaration.has_body);
    }

    #[test]
    fn test_sorry_detection_ignores_comments() {
        let blocks = blocks();
        assert!(!blocks[0].has_sorry());
        assert!(blocks[1].has_sorry());

        let commented = scan(&strip_comments("theorem t : True := by\n  trivial -- sorry\n"));
        assert!(!commented[0].has_sorry());
    }

    #[test]
    fn test_modifiers_and_attributes() {
        let blocks = scan("@[simp] private theorem t : True := trivial\nnoncomputable def f : Nat := 0\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].declaration.label, "t");
        assert_eq!(blocks[1].declaration.kind, DeclarationKind::Definition);
    }

    #[test]
    fn test_binder_colons_are_skipped() {
        let blocks = scan("theorem t {α : Type} [inst : Inhabited α] (x : α) : x = x := rfl\n");
        assert_eq!(blocks[0].declaration.statement.as_deref(), Some("x = x"));
    }

    #[test]
    fn test_no_declarations() {
        assert!(scan("").is_empty());
        assert!(scan("import Mathlib\nopen Nat\n").is_empty());
    }
}
