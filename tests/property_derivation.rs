//! Property tests for derivation and classification.

mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use serde_json::Value;

use common::fixed_now;
use proofsync::domain::models::{apply_patches, DerivationContext, Diagnostic, ErrorCategory};
use proofsync::services::{classify, derivation_patches, DerivationEngine};

const STATEMENTS: [&str; 5] = [
    "n + 0 = n",
    "0 + n = n",
    "n * 1 = n",
    "n ≤ n + 1",
    "(n - n) = 0",
];

#[derive(Debug, Clone)]
struct Decl {
    name: String,
    statement: &'static str,
    sorry: bool,
}

fn decl_strategy() -> impl Strategy<Value = Decl> {
    ("[a-z]{1,6}", prop::sample::select(STATEMENTS.to_vec()), any::<bool>())
        .prop_map(|(name, statement, sorry)| Decl { name, statement, sorry })
}

/// Render declarations as a source file. `cosmetic` widens spacing and adds
/// comments without moving any line.
fn render(decls: &[Decl], cosmetic: bool) -> String {
    let mut out = String::new();
    for (i, decl) in decls.iter().enumerate() {
        let statement = if cosmetic {
            decl.statement.replace(' ', "   ")
        } else {
            decl.statement.to_string()
        };
        let tail = if cosmetic { " /- note -/ := by -- why" } else { " := by" };
        let body = if decl.sorry { "sorry" } else { "simp" };
        out.push_str(&format!("theorem {}{i} (n : Nat) : {statement}{tail}\n  {body}\n\n", decl.name));
    }
    out
}

fn derive(source: &str, diagnostics: Vec<Diagnostic>) -> proofsync::services::Derivation {
    let context = DerivationContext::new("Prop.lean", source).with_diagnostics(diagnostics);
    DerivationEngine::new().derive(&context, fixed_now())
}

proptest! {
    /// Goal and node ids survive whitespace and comment edits.
    #[test]
    fn prop_ids_stable_under_cosmetic_edits(decls in prop::collection::vec(decl_strategy(), 1..8)) {
        let plain = derive(&render(&decls, false), Vec::new());
        let edited = derive(&render(&decls, true), Vec::new());

        let plain_goals: BTreeSet<_> = plain.goals.keys().cloned().collect();
        let edited_goals: BTreeSet<_> = edited.goals.keys().cloned().collect();
        prop_assert_eq!(plain_goals, edited_goals);

        let plain_nodes: BTreeSet<_> = plain.graph.nodes.keys().cloned().collect();
        let edited_nodes: BTreeSet<_> = edited.graph.nodes.keys().cloned().collect();
        prop_assert_eq!(plain_nodes, edited_nodes);

        for (id, goal) in &plain.goals {
            prop_assert_eq!(Some(goal.status), edited.goals.get(id).map(|g| g.status));
        }
    }

    /// Same input, same instant: same derivation, and committing it twice
    /// leaves the same tree as committing it once.
    #[test]
    fn prop_derivation_idempotent(
        decls in prop::collection::vec(decl_strategy(), 0..6),
        error_lines in prop::collection::vec(1u32..30, 0..4),
    ) {
        let source = render(&decls, false);
        let diagnostics: Vec<Diagnostic> = error_lines
            .iter()
            .map(|&line| Diagnostic::error("unsolved goals", line))
            .collect();

        let first = derive(&source, diagnostics.clone());
        let second = derive(&source, diagnostics);
        prop_assert_eq!(&first, &second);

        let patches = derivation_patches("Prop.lean", first);
        let mut once = Value::Null;
        apply_patches(&mut once, &patches);
        let mut twice = once.clone();
        apply_patches(&mut twice, &patches);
        prop_assert_eq!(once, twice);
    }

    /// Derived graphs are always structurally valid and every goal has a node.
    #[test]
    fn prop_graph_valid(
        decls in prop::collection::vec(decl_strategy(), 0..6),
        error_lines in prop::collection::vec(1u32..40, 0..5),
    ) {
        let diagnostics = error_lines
            .iter()
            .map(|&line| Diagnostic::error("type mismatch", line))
            .collect();
        let derivation = derive(&render(&decls, false), diagnostics);

        let linked: BTreeSet<_> = derivation
            .graph
            .nodes
            .values()
            .filter_map(|n| n.goal_id.clone())
            .collect();
        for id in derivation.goals.keys() {
            prop_assert!(linked.contains(id), "goal {} has no node", id);
        }
        prop_assert!(derivation.graph.validated().is_some());
    }

    /// Classification is total and deterministic.
    #[test]
    fn prop_classifier_total(message in "\\PC{0,200}") {
        let category = classify(&message);
        prop_assert!(ErrorCategory::ALL.contains(&category));
        prop_assert_eq!(category, classify(&message));
    }
}
