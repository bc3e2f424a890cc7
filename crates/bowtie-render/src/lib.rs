#![forbid(unsafe_code)]

//! Layout + SVG rendering for bowtie diagrams.
//!
//! [`layout::layout_diagram`] assigns abstract column/row coordinates; [`svg::render_bowtie_svg`]
//! scales them to pixels and draws the diagram.

pub mod layout;
pub mod model;
pub mod svg;
pub mod text;

pub use layout::{Point, PositionMap, layout_diagram};
pub use model::{Bounds, LayoutedBowtie};
pub use svg::{SvgRenderOptions, render_bowtie_svg, sanitize_svg_id};
pub use text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};

use bowtie_core::{BowtieConfig, BowtieInput, Diagram, diagram_from_input};

/// Builds and lays out `input` in one step.
pub fn layout_input(input: &BowtieInput, config: &BowtieConfig) -> (Diagram, PositionMap) {
    let diagram = diagram_from_input(input, config);
    let positions = layout_diagram(&diagram, &config.layout);
    (diagram, positions)
}
