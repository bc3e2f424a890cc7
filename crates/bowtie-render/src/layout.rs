//! Fixed three-column bowtie layout.
//!
//! Coordinates are abstract units with y growing upwards: threats at `x = -s`, the hazard at
//! `x = 0`, consequences at `x = s`. Rows are one unit apart and start at `y = 0`, so later rows
//! have more negative y. The hazard sits at `y = -threats / 2`.

use crate::model::Bounds;
use bowtie_core::{Diagram, LayoutConfig, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node positions in layout order: threats, hazard, consequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionMap {
    positions: IndexMap<NodeId, Point>,
}

impl PositionMap {
    pub fn get(&self, id: &NodeId) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Point)> {
        self.positions.iter().map(|(k, v)| (k, *v))
    }

    /// Bounding box of the node centers.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.positions.values().map(|p| (p.x, p.y)))
    }

    /// True when every node of `diagram` has a position.
    pub fn covers(&self, diagram: &Diagram) -> bool {
        diagram.nodes().all(|n| self.contains(&n.id))
    }
}

impl Index<&NodeId> for PositionMap {
    type Output = Point;

    /// # Panics
    ///
    /// Panics when `id` has no position. Renderers rely on the layout covering every node.
    fn index(&self, id: &NodeId) -> &Point {
        match self.positions.get(id) {
            Some(p) => p,
            None => panic!("no layout position for node `{id}`"),
        }
    }
}

fn effective_spacing(config: &LayoutConfig) -> f64 {
    let s = config.column_spacing;
    if s.is_finite() && s > 0.0 {
        s
    } else {
        let fallback = LayoutConfig::default().column_spacing;
        tracing::warn!(
            column_spacing = s,
            fallback,
            "column spacing must be a positive number; using default"
        );
        fallback
    }
}

fn effective_offset(config: &LayoutConfig) -> f64 {
    if config.consequence_offset.is_finite() {
        config.consequence_offset
    } else {
        tracing::warn!(
            consequence_offset = config.consequence_offset,
            "consequence offset must be finite; using 0"
        );
        0.0
    }
}

/// Assigns a position to every node of `diagram`.
///
/// Pure: identical diagrams and configs always yield identical maps.
pub fn layout_diagram(diagram: &Diagram, config: &LayoutConfig) -> PositionMap {
    let spacing = effective_spacing(config);
    let offset = effective_offset(config);

    let mut positions = IndexMap::with_capacity(diagram.node_count());
    for (i, t) in diagram.threats().iter().enumerate() {
        positions.insert(t.id.clone(), Point::new(-spacing, -(i as f64)));
    }
    positions.insert(
        diagram.hazard().id.clone(),
        Point::new(0.0, -(diagram.threats().len() as f64) / 2.0),
    );
    for (i, c) in diagram.consequences().iter().enumerate() {
        positions.insert(c.id.clone(), Point::new(spacing, -(i as f64 + offset)));
    }

    tracing::debug!(nodes = positions.len(), spacing, offset, "laid out bowtie");
    PositionMap { positions }
}
