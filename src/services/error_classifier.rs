//! Error message classification.
//!
//! Rules are evaluated in a fixed order and the first category with any
//! matching pattern wins. Later rules hold broader patterns, so the order
//! is load-bearing: the syntax-error catch-all must stay last.

use std::sync::OnceLock;

use regex::RegexSet;

use crate::domain::models::ErrorCategory;

/// Ordered classification rules. Patterns are case-insensitive.
const RULES: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::Timeout,
        &[
            r"\btime(d)?\s*out\b",
            r"\btimeout\b",
            r"maximum recursion depth",
            r"\bheartbeats?\b",
        ],
    ),
    (
        ErrorCategory::UnknownIdentifier,
        &[
            r"unknown (identifier|constant|declaration|namespace)",
            r"unknown free variable",
            r"is not a (field|member) of",
        ],
    ),
    (
        ErrorCategory::TypeMismatch,
        &[
            r"type mismatch",
            r"has type.*but is expected to have type",
            r"failed to synthesize",
            r"cannot unify",
        ],
    ),
    (
        ErrorCategory::TacticFailed,
        &[
            r"tactic '[^']+' failed",
            r"\b(simp|linarith|omega|decide|norm_num|ring|nlinarith|positivity|aesop)\b.*\b(failed|made no progress)",
            r"made no progress",
            r"rewrite failed",
            r"motive is not type correct",
            r"did not find instance of the pattern",
        ],
    ),
    (
        ErrorCategory::UnsolvedGoals,
        &[r"unsolved goals", r"goals? (remain|accomplished: no)", r"no goals to be proved"],
    ),
    (
        ErrorCategory::KernelError,
        &[
            r"\(kernel\)",
            r"kernel (error|exception)",
            r"declaration has (free variables|metavariables)",
        ],
    ),
    (
        ErrorCategory::SyntaxError,
        &[
            r"unexpected (token|identifier|end of input)",
            r"parse error",
            r"syntax error",
            r"\bexpected\b",
        ],
    ),
];

struct CompiledRules {
    sets: Vec<(ErrorCategory, RegexSet)>,
}

fn compiled() -> &'static CompiledRules {
    static RULES_CELL: OnceLock<CompiledRules> = OnceLock::new();
    RULES_CELL.get_or_init(|| {
        let sets = RULES
            .iter()
            .filter_map(|(category, patterns)| {
                let case_insensitive = patterns.iter().map(|p| format!("(?i){p}"));
                match RegexSet::new(case_insensitive) {
                    Ok(set) => Some((*category, set)),
                    Err(err) => {
                        tracing::error!(category = %category, error = %err, "invalid classifier pattern");
                        None
                    }
                }
            })
            .collect();
        CompiledRules { sets }
    })
}

/// Classify a failure message. Total: unmatched text yields `Other`.
pub fn classify(message: &str) -> ErrorCategory {
    compiled()
        .sets
        .iter()
        .find(|(_, set)| set.is_match(message))
        .map_or(ErrorCategory::Other, |(category, _)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_category() {
        let cases = [
            ("(deterministic) timeout at whnf, maximum number of heartbeats (200000)", ErrorCategory::Timeout),
            ("unknown identifier 'Nat.foo_bar'", ErrorCategory::UnknownIdentifier),
            ("unknown constant 'List.mapp'", ErrorCategory::UnknownIdentifier),
            ("type mismatch\n  h\nhas type\n  a = b : Prop\nbut is expected to have type\n  b = a : Prop", ErrorCategory::TypeMismatch),
            ("failed to synthesize\n  HAdd Nat Int ?m", ErrorCategory::TypeMismatch),
            ("linarith failed to find a contradiction", ErrorCategory::TacticFailed),
            ("simp made no progress", ErrorCategory::TacticFailed),
            ("tactic 'rfl' failed, the left-hand side", ErrorCategory::TacticFailed),
            ("unsolved goals\ncase succ\n⊢ n + 1 = 1 + n", ErrorCategory::UnsolvedGoals),
            ("(kernel) declaration has metavariables 'foo'", ErrorCategory::KernelError),
            ("unexpected token 'at'; expected term", ErrorCategory::SyntaxError),
            ("something entirely different", ErrorCategory::Other),
            ("", ErrorCategory::Other),
        ];
        for (message, expected) in cases {
            assert_eq!(classify(message), expected, "message: {message}");
        }
    }

    #[test]
    fn test_order_resolves_overlaps() {
        // mentions both a timeout and an expected token; timeout rule is first
        assert_eq!(
            classify("timeout while parsing: expected ')'"),
            ErrorCategory::Timeout
        );
        // "expected to have type" would hit the syntax catch-all if it ran first
        assert_eq!(
            classify("argument has type Nat but is expected to have type Int"),
            ErrorCategory::TypeMismatch
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("UNKNOWN IDENTIFIER 'x'"), ErrorCategory::UnknownIdentifier);
    }

    #[test]
    fn test_every_rule_compiles() {
        assert_eq!(compiled().sets.len(), RULES.len());
    }
}
