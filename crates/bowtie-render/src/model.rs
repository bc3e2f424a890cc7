use crate::layout::PositionMap;
use bowtie_core::{Category, Diagram};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutNode {
    /// Category-tagged node key.
    pub id: String,
    pub category: Category,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub from: String,
    pub to: String,
}

/// Serializable snapshot of a diagram plus its positions, in layout units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutedBowtie {
    pub hazard: String,
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub bounds: Option<Bounds>,
}

impl LayoutedBowtie {
    /// # Panics
    ///
    /// Panics when `positions` does not cover every node of `diagram`.
    pub fn new(diagram: &Diagram, positions: &PositionMap) -> Self {
        let nodes = diagram
            .nodes()
            .map(|n| {
                let p = positions[&n.id];
                LayoutNode {
                    id: n.id.key(),
                    category: n.category(),
                    label: n.label().to_string(),
                    x: p.x,
                    y: p.y,
                }
            })
            .collect();
        let edges = diagram
            .edges()
            .iter()
            .map(|e| LayoutEdge {
                from: e.from.key(),
                to: e.to.key(),
            })
            .collect();
        Self {
            hazard: diagram.hazard().label().to_string(),
            nodes,
            edges,
            bounds: positions.bounds(),
        }
    }
}
