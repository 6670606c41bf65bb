//! Goal-text normalization.
//!
//! Goal signatures let ranking recognise the same obligation across files
//! and edits despite cosmetic differences in the goal text.

/// Remove `--` line comments and `/- ... -/` block comments (nesting aware).
///
/// Newlines are preserved, including those inside block comments, so line
/// numbers of the output match the input. Unterminated block comments
/// swallow the rest of the input.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('-')) => {
                chars.next();
                depth += 1;
            }
            ('-', Some('/')) if depth > 0 => {
                chars.next();
                depth -= 1;
                if depth == 0 {
                    out.push(' ');
                }
            }
            ('\n', _) if depth > 0 => out.push('\n'),
            _ if depth > 0 => {}
            ('-', Some('-')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comment-free, whitespace-collapsed form of a statement.
pub fn normalize_statement(text: &str) -> String {
    collapse_whitespace(&strip_comments(text))
}

/// Canonical matching key for free-form goal text.
///
/// On top of statement normalization, the turnstile prefix is dropped and
/// only the final goal line (the conclusion after the last `⊢`) is kept, so
/// hypothesis naming does not affect the match.
pub fn goal_signature(goal_text: &str) -> Option<String> {
    let stripped = strip_comments(goal_text);
    let conclusion = stripped.rsplit('⊢').next().unwrap_or(&stripped);
    let signature = collapse_whitespace(conclusion);
    if signature.is_empty() {
        None
    } else {
        Some(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_comment_keeps_newline() {
        assert_eq!(strip_comments("a -- note\nb"), "a \nb");
    }

    #[test]
    fn test_strip_nested_block_comment() {
        assert_eq!(
            normalize_statement("a /- outer /- inner -/ still -/ = b"),
            "a = b"
        );
    }

    #[test]
    fn test_block_comment_keeps_line_count() {
        let source = "a\n/- one\ntwo\n-/\nb";
        assert_eq!(strip_comments(source).lines().count(), source.lines().count());
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert_eq!(normalize_statement("x /- never closed = y"), "x");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_statement("  a\t+  b\n=   b + a  "), "a + b = b + a");
    }

    #[test]
    fn test_signature_keeps_conclusion_only() {
        let a = goal_signature("n : Nat\nh : n > 0\n⊢ n + 0 = n").unwrap();
        let b = goal_signature("m : Nat\n⊢   n + 0   =  n").unwrap();
        assert_eq!(a, "n + 0 = n");
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_without_turnstile() {
        assert_eq!(goal_signature("a = a -- trivially").as_deref(), Some("a = a"));
        assert_eq!(goal_signature("  -- only a comment"), None);
    }
}
