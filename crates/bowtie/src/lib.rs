#![forbid(unsafe_code)]

//! `bowtie` is a headless bowtie risk diagram generator.
//!
//! Threats and consequences (usually read from a workbook) are built into a [`Diagram`], laid
//! out in three fixed columns around the hazard, and rendered to SVG. Raster and document output
//! and a side channel that asks a hosted completion service for further suggestions sit behind
//! cargo features.
//!
//! # Features
//!
//! - `render`: enable layout + SVG rendering (`bowtie::render`)
//! - `raster`: enable PNG/JPG/PDF output via pure-Rust SVG rasterization/conversion
//! - `workbook`: read `Threats`/`Consequences` sheets from `.xlsx`/`.xls`/`.ods` files
//! - `suggest`: chat-completion client for threat/consequence/control suggestions

pub use bowtie_core::*;

#[cfg(feature = "workbook")]
pub mod workbook;

#[cfg(feature = "suggest")]
pub mod suggest;

#[cfg(feature = "render")]
pub mod render {
    pub use bowtie_render::layout::{Point, PositionMap, layout_diagram};
    pub use bowtie_render::layout_input;
    pub use bowtie_render::model::{Bounds, LayoutedBowtie};
    pub use bowtie_render::svg::{SvgRenderOptions, render_bowtie_svg, sanitize_svg_id};
    pub use bowtie_render::text::{DeterministicTextMeasurer, TextMeasurer, TextStyle};

    use bowtie_core::{BowtieConfig, BowtieInput, Diagram, StyleConfig};
    use std::sync::Arc;

    #[cfg(feature = "raster")]
    pub mod raster;

    /// Synchronous one-shot render with the deterministic text measurer.
    pub fn render_svg(
        input: &BowtieInput,
        config: &BowtieConfig,
        svg_options: &SvgRenderOptions,
    ) -> String {
        BowtieRenderer::new()
            .with_config(config.clone())
            .with_svg_options(svg_options.clone())
            .render_svg(input)
    }

    /// Bundles the configuration of one parameterized pipeline: builder → layout → renderer.
    ///
    /// All work is CPU-bound and performs no I/O; a renderer can be reused for any number of
    /// inputs since nothing is cached between calls.
    #[derive(Clone)]
    pub struct BowtieRenderer {
        pub config: BowtieConfig,
        pub svg: SvgRenderOptions,
        pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    }

    impl Default for BowtieRenderer {
        fn default() -> Self {
            Self {
                config: BowtieConfig::default(),
                svg: SvgRenderOptions::default(),
                text_measurer: Arc::new(DeterministicTextMeasurer::default()),
            }
        }
    }

    impl BowtieRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_config(mut self, config: BowtieConfig) -> Self {
            self.config = config;
            self
        }

        pub fn with_hazard(mut self, hazard: impl Into<String>) -> Self {
            self.config.hazard = hazard.into();
            self
        }

        pub fn with_style(mut self, style: StyleConfig) -> Self {
            self.config.style = style;
            self
        }

        pub fn with_svg_options(mut self, svg: SvgRenderOptions) -> Self {
            self.svg = svg;
            self
        }

        pub fn with_text_measurer(
            mut self,
            measurer: Arc<dyn TextMeasurer + Send + Sync>,
        ) -> Self {
            self.text_measurer = measurer;
            self
        }

        pub fn diagram(&self, input: &BowtieInput) -> Diagram {
            bowtie_core::diagram_from_input(input, &self.config)
        }

        pub fn layout(&self, diagram: &Diagram) -> PositionMap {
            layout_diagram(diagram, &self.config.layout)
        }

        /// Diagram and positions as a serializable snapshot (layout units).
        pub fn layout_snapshot(&self, input: &BowtieInput) -> LayoutedBowtie {
            let diagram = self.diagram(input);
            let positions = self.layout(&diagram);
            LayoutedBowtie::new(&diagram, &positions)
        }

        pub fn render_diagram_svg(&self, diagram: &Diagram, positions: &PositionMap) -> String {
            render_bowtie_svg(
                diagram,
                positions,
                &self.config.style,
                self.text_measurer.as_ref(),
                &self.svg,
            )
        }

        pub fn render_svg(&self, input: &BowtieInput) -> String {
            let diagram = self.diagram(input);
            let positions = self.layout(&diagram);
            tracing::info!(
                threats = diagram.threats().len(),
                consequences = diagram.consequences().len(),
                shape = %self.config.style.node_shape,
                "rendering bowtie"
            );
            self.render_diagram_svg(&diagram, &positions)
        }

        pub fn render_svg_with_diagram_id(&self, input: &BowtieInput, diagram_id: &str) -> String {
            let mut svg = self.svg.clone();
            svg.diagram_id = Some(sanitize_svg_id(diagram_id));
            self.clone().with_svg_options(svg).render_svg(input)
        }

        #[cfg(feature = "raster")]
        pub fn render_png(
            &self,
            input: &BowtieInput,
            raster: &raster::RasterOptions,
        ) -> raster::Result<Vec<u8>> {
            raster::svg_to_png(&self.render_svg(input), raster)
        }

        #[cfg(feature = "raster")]
        pub fn render_jpeg(
            &self,
            input: &BowtieInput,
            raster: &raster::RasterOptions,
        ) -> raster::Result<Vec<u8>> {
            raster::svg_to_jpeg(&self.render_svg(input), raster)
        }

        #[cfg(feature = "raster")]
        pub fn render_pdf(&self, input: &BowtieInput) -> raster::Result<Vec<u8>> {
            raster::svg_to_pdf(&self.render_svg(input))
        }
    }
}
