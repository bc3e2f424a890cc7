use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the bowtie a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Threat,
    Hazard,
    Consequence,
}

impl Category {
    /// Prefix used when tagging a label into a node key.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::Threat => "threat",
            Category::Hazard => "hazard",
            Category::Consequence => "consequence",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Node identity: the category is part of the key, so `threat:Power Loss` and
/// `consequence:Power Loss` never collapse into one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub category: Category,
    pub label: String,
}

impl NodeId {
    pub fn new(category: Category, label: impl Into<String>) -> Self {
        Self {
            category,
            label: label.into(),
        }
    }

    pub fn threat(label: impl Into<String>) -> Self {
        Self::new(Category::Threat, label)
    }

    pub fn hazard(label: impl Into<String>) -> Self {
        Self::new(Category::Hazard, label)
    }

    pub fn consequence(label: impl Into<String>) -> Self {
        Self::new(Category::Consequence, label)
    }

    /// Category-tagged key, e.g. `threat:Valve Failure`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category.prefix(), self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self { id }
    }

    pub fn label(&self) -> &str {
        &self.id.label
    }

    pub fn category(&self) -> Category {
        self.id.category
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

/// A built bowtie: threats converge on the hazard, the hazard diverges into consequences.
///
/// Values are only produced by [`crate::DiagramBuilder`] and expose no mutating API, so the
/// degree invariants established at construction hold for the lifetime of the value:
///
/// - every threat has exactly one outgoing edge, to the hazard
/// - every consequence has exactly one incoming edge, from the hazard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagram {
    pub(crate) threats: Vec<Node>,
    pub(crate) hazard: Node,
    pub(crate) consequences: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
}

impl Diagram {
    /// Threat nodes in row order.
    pub fn threats(&self) -> &[Node] {
        &self.threats
    }

    pub fn hazard(&self) -> &Node {
        &self.hazard
    }

    /// Consequence nodes in row order.
    pub fn consequences(&self) -> &[Node] {
        &self.consequences
    }

    /// Threat edges first (threat order), then consequence edges (consequence order).
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// All nodes: threats, hazard, consequences.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.threats
            .iter()
            .chain(std::iter::once(&self.hazard))
            .chain(self.consequences.iter())
    }

    pub fn node_count(&self) -> usize {
        self.threats.len() + 1 + self.consequences.len()
    }

    pub fn is_degenerate(&self) -> bool {
        self.threats.is_empty() || self.consequences.is_empty()
    }

    pub fn in_degree(&self, id: &NodeId) -> usize {
        self.edges.iter().filter(|e| &e.to == id).count()
    }

    pub fn out_degree(&self, id: &NodeId) -> usize {
        self.edges.iter().filter(|e| &e.from == id).count()
    }
}
