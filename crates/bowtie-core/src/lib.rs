#![forbid(unsafe_code)]

//! Bowtie diagram model (headless).
//!
//! A bowtie has threats on the left converging on one hazard (the top event), which diverges into
//! consequences on the right. This crate owns the value types and the builder; layout and SVG
//! output live in `bowtie-render`.
//!
//! Design goals:
//! - category-qualified node identity (equal text on both sides stays two nodes)
//! - immutable, deterministic diagrams built fresh per render
//! - configuration passed explicitly, never read from ambient state

pub mod builder;
pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod prompt;

pub use builder::{DiagramBuilder, build_diagram, normalize_label};
pub use config::{BowtieConfig, DEFAULT_HAZARD, LayoutConfig, NodeShape, StyleConfig};
pub use error::{Error, Result};
pub use input::BowtieInput;
pub use model::{Category, Diagram, Edge, Node, NodeId};
pub use prompt::SuggestionPrompt;

/// Builds the diagram for `input` using the hazard label from `config`.
pub fn diagram_from_input(input: &BowtieInput, config: &BowtieConfig) -> Diagram {
    build_diagram(input.threats(), input.consequences(), &config.hazard)
}
