use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_HAZARD: &str = "Loss of Containment\nwith hydrocarbon\nspilled to the bund";
pub const DEFAULT_THREAT_COLOR: &str = "#00BFFF";
pub const DEFAULT_CONSEQUENCE_COLOR: &str = "#FF4500";
pub const DEFAULT_HAZARD_COLOR: &str = "#FFA500";

/// Outline used for every node of the diagram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeShape {
    #[default]
    Square,
    Circle,
    Diamond,
    TriangleUp,
    TriangleDown,
}

impl NodeShape {
    pub const ALL: [NodeShape; 5] = [
        NodeShape::Square,
        NodeShape::Circle,
        NodeShape::Diamond,
        NodeShape::TriangleUp,
        NodeShape::TriangleDown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeShape::Square => "square",
            NodeShape::Circle => "circle",
            NodeShape::Diamond => "diamond",
            NodeShape::TriangleUp => "triangle-up",
            NodeShape::TriangleDown => "triangle-down",
        }
    }
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeShape {
    type Err = Error;

    /// Accepts shape names and the single-character marker codes (`s`, `o`, `D`, `^`, `v`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let shape = match s {
            "s" => NodeShape::Square,
            "o" => NodeShape::Circle,
            "D" | "d" => NodeShape::Diamond,
            "^" => NodeShape::TriangleUp,
            "v" => NodeShape::TriangleDown,
            _ => match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
                "square" => NodeShape::Square,
                "circle" => NodeShape::Circle,
                "diamond" => NodeShape::Diamond,
                "triangle-up" => NodeShape::TriangleUp,
                "triangle-down" => NodeShape::TriangleDown,
                _ => {
                    return Err(Error::UnknownShape {
                        shape: s.to_string(),
                    });
                }
            },
        };
        Ok(shape)
    }
}

/// Per-category fill colors and the shared node shape for one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    pub threat_color: String,
    pub consequence_color: String,
    pub hazard_color: String,
    pub node_shape: NodeShape,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            threat_color: DEFAULT_THREAT_COLOR.to_string(),
            consequence_color: DEFAULT_CONSEQUENCE_COLOR.to_string(),
            hazard_color: DEFAULT_HAZARD_COLOR.to_string(),
            node_shape: NodeShape::default(),
        }
    }
}

impl StyleConfig {
    pub fn color_for(&self, category: crate::Category) -> &str {
        match category {
            crate::Category::Threat => &self.threat_color,
            crate::Category::Hazard => &self.hazard_color,
            crate::Category::Consequence => &self.consequence_color,
        }
    }
}

/// Column geometry in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Horizontal distance between the hazard column and either side column.
    pub column_spacing: f64,
    /// Rows to push the consequence column down by (0 aligns it with the threat column).
    pub consequence_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_spacing: 2.0,
            consequence_offset: 0.0,
        }
    }
}

/// Everything one render needs besides the labels themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BowtieConfig {
    pub hazard: String,
    pub style: StyleConfig,
    pub layout: LayoutConfig,
}

impl Default for BowtieConfig {
    fn default() -> Self {
        Self {
            hazard: DEFAULT_HAZARD.to_string(),
            style: StyleConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl BowtieConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })
    }

    pub fn with_hazard(mut self, hazard: impl Into<String>) -> Self {
        self.hazard = hazard.into();
        self
    }

    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }
}
