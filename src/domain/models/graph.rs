//! Dependency graph of proof obligations.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::diagnostic::SourceRange;
use super::error_category::ErrorCategory;
use super::goal::DeclarationKind;

/// Id of the synthetic root node every derivation produces.
pub const ROOT_NODE_ID: &str = "root";

/// What a graph node mirrors in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Theorem,
    Lemma,
    Example,
    Definition,
    /// An error diagnostic not covered by any declaration
    Diagnostic,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Theorem => "theorem",
            Self::Lemma => "lemma",
            Self::Example => "example",
            Self::Definition => "definition",
            Self::Diagnostic => "diagnostic",
        }
    }
}

impl From<DeclarationKind> for NodeKind {
    fn from(kind: DeclarationKind) -> Self {
        match kind {
            DeclarationKind::Theorem => Self::Theorem,
            DeclarationKind::Lemma => Self::Lemma,
            DeclarationKind::Example => Self::Example,
            DeclarationKind::Definition => Self::Definition,
        }
    }
}

/// Elaboration status of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Resolved,
    Error,
    Sorry,
    InProgress,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Error => "error",
            Self::Sorry => "sorry",
            Self::InProgress => "in_progress",
        }
    }

    /// Open obligations still need a proof.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Sorry | Self::InProgress)
    }

    /// Aggregate child statuses: any error wins, then any open child.
    pub fn aggregate<'a>(children: impl IntoIterator<Item = &'a NodeStatus>) -> Self {
        let mut any_open = false;
        for status in children {
            match status {
                Self::Error => return Self::Error,
                s if s.is_open() => any_open = true,
                _ => {}
            }
        }
        if any_open {
            Self::InProgress
        } else {
            Self::Resolved
        }
    }
}

/// A node in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub node_id: String,
    pub label: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
}

/// Directed parent → child edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Dependency graph produced by one derivation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub root_id: String,
}

impl DependencyGraph {
    /// A graph holding only a resolved root.
    pub fn empty(label: impl Into<String>) -> Self {
        let root = GraphNode {
            node_id: ROOT_NODE_ID.to_string(),
            label: label.into(),
            kind: NodeKind::Root,
            range: None,
            parent_id: None,
            status: NodeStatus::Resolved,
            error_message: None,
            error_category: None,
            goal_id: None,
        };
        let mut nodes = BTreeMap::new();
        nodes.insert(root.node_id.clone(), root);
        Self {
            nodes,
            edges: Vec::new(),
            root_id: ROOT_NODE_ID.to_string(),
        }
    }

    pub fn root(&self) -> Option<&GraphNode> {
        self.nodes.get(&self.root_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&GraphNode> {
        self.nodes.get(node_id)
    }

    /// Insert a child under the root. A node with the same id is replaced.
    pub fn attach_to_root(&mut self, mut node: GraphNode) {
        node.parent_id = Some(self.root_id.clone());
        let edge = GraphEdge {
            from: self.root_id.clone(),
            to: node.node_id.clone(),
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        self.nodes.insert(node.node_id.clone(), node);
    }

    /// Recompute the root status from its direct children.
    pub fn refresh_root_status(&mut self) {
        let status = NodeStatus::aggregate(
            self.nodes
                .values()
                .filter(|n| n.parent_id.as_deref() == Some(self.root_id.as_str()))
                .map(|n| &n.status),
        );
        if let Some(root) = self.nodes.get_mut(&self.root_id) {
            root.status = status;
        }
    }

    pub fn children_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphNode> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.from == node_id)
            .filter_map(|e| self.nodes.get(&e.to))
    }

    /// Return the graph only if it is internally consistent: the root
    /// exists, every edge endpoint and parent link names a known node, and
    /// there is no cycle. Callers treat `None` as "no graph available".
    pub fn validated(self) -> Option<Self> {
        if !self.nodes.contains_key(&self.root_id) {
            tracing::warn!(root_id = %self.root_id, "graph rejected: missing root");
            return None;
        }

        for (id, node) in &self.nodes {
            if id != &node.node_id {
                tracing::warn!(key = %id, node_id = %node.node_id, "graph rejected: key mismatch");
                return None;
            }
            match &node.parent_id {
                Some(parent) if !self.nodes.contains_key(parent) => {
                    tracing::warn!(node_id = %id, parent = %parent, "graph rejected: unknown parent");
                    return None;
                }
                None if id != &self.root_id => {
                    tracing::warn!(node_id = %id, "graph rejected: orphan node");
                    return None;
                }
                _ => {}
            }
        }

        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.from) || !self.nodes.contains_key(&edge.to) {
                tracing::warn!(from = %edge.from, to = %edge.to, "graph rejected: dangling edge");
                return None;
            }
        }

        if let Some(cycle) = self.find_cycle() {
            tracing::warn!(cycle = ?cycle, "graph rejected: cycle");
            return None;
        }

        Some(self)
    }

    /// DFS cycle detection over edges and parent links.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
        }
        for node in self.nodes.values() {
            if let Some(parent) = &node.parent_id {
                adjacency.entry(parent.as_str()).or_default().push(node.node_id.as_str());
            }
        }

        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();
        for start in self.nodes.keys() {
            if !visited.contains(start.as_str())
                && visit(start, &adjacency, &mut visited, &mut on_stack, &mut path)
            {
                return Some(path.into_iter().map(str::to_string).collect());
            }
        }
        None
    }
}

fn visit<'a>(
    node: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    on_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> bool {
    visited.insert(node);
    on_stack.insert(node);
    path.push(node);

    for &next in adjacency.get(node).map(Vec::as_slice).unwrap_or_default() {
        if !visited.contains(next) {
            if visit(next, adjacency, visited, on_stack, path) {
                return true;
            }
        } else if on_stack.contains(next) {
            if let Some(start) = path.iter().position(|&id| id == next) {
                path.drain(0..start);
            }
            return true;
        }
    }

    on_stack.remove(node);
    path.pop();
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(id: &str, status: NodeStatus) -> GraphNode {
        GraphNode {
            node_id: id.to_string(),
            label: id.to_string(),
            kind: NodeKind::Theorem,
            range: None,
            parent_id: None,
            status,
            error_message: None,
            error_category: None,
            goal_id: None,
        }
    }

    #[test]
    fn test_aggregate_status() {
        use NodeStatus::*;
        assert_eq!(NodeStatus::aggregate(&[]), Resolved);
        assert_eq!(NodeStatus::aggregate(&[Resolved, Sorry]), InProgress);
        assert_eq!(NodeStatus::aggregate(&[InProgress, Error, Resolved]), Error);
        assert_eq!(NodeStatus::aggregate(&[Resolved, Resolved]), Resolved);
    }

    #[test]
    fn test_attach_and_refresh_root() {
        let mut graph = DependencyGraph::empty("Main.lean");
        graph.attach_to_root(child("a", NodeStatus::Resolved));
        graph.attach_to_root(child("b", NodeStatus::Sorry));
        graph.refresh_root_status();

        assert_eq!(graph.root().unwrap().status, NodeStatus::InProgress);
        assert_eq!(graph.children_of(ROOT_NODE_ID).count(), 2);
        assert!(graph.validated().is_some());
    }

    #[test]
    fn test_attach_same_id_replaces() {
        let mut graph = DependencyGraph::empty("f");
        graph.attach_to_root(child("a", NodeStatus::Resolved));
        graph.attach_to_root(child("a", NodeStatus::Error));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.node("a").unwrap().status, NodeStatus::Error);
    }

    #[test]
    fn test_validation_rejects_dangling_edge() {
        let mut graph = DependencyGraph::empty("f");
        graph.edges.push(GraphEdge {
            from: ROOT_NODE_ID.to_string(),
            to: "ghost".to_string(),
        });
        assert!(graph.validated().is_none());
    }

    #[test]
    fn test_validation_rejects_unknown_parent_and_orphans() {
        let mut graph = DependencyGraph::empty("f");
        let mut node = child("a", NodeStatus::Resolved);
        node.parent_id = Some("missing".to_string());
        graph.nodes.insert("a".to_string(), node);
        assert!(graph.clone().validated().is_none());

        graph.nodes.get_mut("a").unwrap().parent_id = None;
        assert!(graph.validated().is_none());
    }

    #[test]
    fn test_validation_rejects_cycle() {
        let mut graph = DependencyGraph::empty("f");
        graph.attach_to_root(child("a", NodeStatus::Resolved));
        graph.attach_to_root(child("b", NodeStatus::Resolved));
        graph.edges.push(GraphEdge { from: "a".to_string(), to: "b".to_string() });
        graph.edges.push(GraphEdge { from: "b".to_string(), to: "a".to_string() });
        assert!(graph.validated().is_none());
    }

    #[test]
    fn test_validation_rejects_missing_root() {
        let mut graph = DependencyGraph::empty("f");
        graph.root_id = "elsewhere".to_string();
        assert!(graph.validated().is_none());
    }
}
