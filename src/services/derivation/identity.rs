//! Stable identifiers for goals and graph nodes.

use sha2::{Digest, Sha256};

/// First 8 bytes of SHA-256 over NUL-joined parts, hex encoded.
fn short_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    digest[..8]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Identity of a declaration: start line plus normalized statement (or the
/// label when there is no statement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationIdentity {
    hash: String,
}

impl DeclarationIdentity {
    pub fn new(start_line: u32, normalized_key: &str) -> Self {
        Self {
            hash: short_hash(&[&start_line.to_string(), normalized_key]),
        }
    }

    pub fn goal_id(&self) -> String {
        format!("goal-{}", self.hash)
    }

    pub fn node_id(&self) -> String {
        format!("decl-{}", self.hash)
    }
}

/// Identity of a standalone diagnostic: line plus normalized message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticIdentity {
    hash: String,
}

impl DiagnosticIdentity {
    pub fn new(line: u32, normalized_message: &str) -> Self {
        Self {
            hash: short_hash(&["diagnostic", &line.to_string(), normalized_message]),
        }
    }

    pub fn goal_id(&self) -> String {
        format!("goal-{}", self.hash)
    }

    pub fn node_id(&self) -> String {
        format!("diag-{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_deterministic() {
        let a = DeclarationIdentity::new(3, "a + b = b + a");
        let b = DeclarationIdentity::new(3, "a + b = b + a");
        assert_eq!(a, b);
        assert_eq!(a.goal_id().len(), "goal-".len() + 16);
        assert!(a.node_id().starts_with("decl-"));
    }

    #[test]
    fn test_identity_depends_on_line_and_statement() {
        let base = DeclarationIdentity::new(3, "p");
        assert_ne!(base, DeclarationIdentity::new(4, "p"));
        assert_ne!(base, DeclarationIdentity::new(3, "q"));
    }

    #[test]
    fn test_parts_are_separated() {
        // "1" + "2x" must not collide with "12" + "x"
        assert_ne!(DeclarationIdentity::new(1, "2x"), DeclarationIdentity::new(12, "x"));
    }

    #[test]
    fn test_diagnostic_namespace_differs() {
        assert_ne!(
            DeclarationIdentity::new(3, "msg").goal_id(),
            DiagnosticIdentity::new(3, "msg").goal_id()
        );
    }
}
