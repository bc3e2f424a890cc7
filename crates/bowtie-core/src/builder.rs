use crate::model::{Category, Diagram, Edge, Node, NodeId};
use rustc_hash::FxHashSet;

/// Builds a [`Diagram`] from row-ordered labels.
///
/// Labels are normalized with [`normalize_label`] and blank labels are skipped. Repeating a label inside one category keeps
/// the first occurrence only; the same text in two categories yields two nodes.
#[derive(Debug, Clone)]
pub struct DiagramBuilder {
    hazard: String,
    threats: Vec<String>,
    consequences: Vec<String>,
}

impl DiagramBuilder {
    pub fn new(hazard: impl Into<String>) -> Self {
        Self {
            hazard: hazard.into(),
            threats: Vec::new(),
            consequences: Vec::new(),
        }
    }

    pub fn threat(mut self, label: impl Into<String>) -> Self {
        self.threats.push(label.into());
        self
    }

    pub fn consequence(mut self, label: impl Into<String>) -> Self {
        self.consequences.push(label.into());
        self
    }

    pub fn threats<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.threats.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn consequences<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consequences
            .extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Diagram {
        let hazard = Node::new(NodeId::hazard(normalize_label(&self.hazard)));
        let threats = unique_nodes(Category::Threat, &self.threats);
        let consequences = unique_nodes(Category::Consequence, &self.consequences);

        let mut edges = Vec::with_capacity(threats.len() + consequences.len());
        for t in &threats {
            edges.push(Edge {
                from: t.id.clone(),
                to: hazard.id.clone(),
            });
        }
        for c in &consequences {
            edges.push(Edge {
                from: hazard.id.clone(),
                to: c.id.clone(),
            });
        }

        tracing::debug!(
            threats = threats.len(),
            consequences = consequences.len(),
            edges = edges.len(),
            "built bowtie diagram"
        );

        Diagram {
            threats,
            hazard,
            consequences,
            edges,
        }
    }
}

/// Trims a label and turns control characters other than `\n` into spaces.
///
/// Spreadsheet cells may carry escaped control characters (`_x000B_`) that XML cannot hold;
/// line breaks stay so multi-line labels keep working.
pub fn normalize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.chars().any(|c| c.is_control() && c != '\n') {
        return trimmed.to_string();
    }
    trimmed
        .chars()
        .map(|c| if c.is_control() && c != '\n' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn unique_nodes(category: Category, labels: &[String]) -> Vec<Node> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut out = Vec::with_capacity(labels.len());
    for label in labels.iter().map(|raw| normalize_label(raw)) {
        if label.is_empty() {
            continue;
        }
        if seen.contains(&label) {
            tracing::debug!(%category, label = %label, "dropping repeated label");
            continue;
        }
        seen.insert(label.clone());
        out.push(Node::new(NodeId::new(category, label)));
    }
    out
}

/// Convenience wrapper over [`DiagramBuilder`].
pub fn build_diagram<T, C>(threats: T, consequences: C, hazard: &str) -> Diagram
where
    T: IntoIterator,
    T::Item: Into<String>,
    C: IntoIterator,
    C::Item: Into<String>,
{
    DiagramBuilder::new(hazard)
        .threats(threats)
        .consequences(consequences)
        .build()
}
