//! SVG output for a laid-out bowtie.
//!
//! Draw order is fixed: edges, then nodes grouped by category (one fill and one outline per
//! group), then labels on top. Only presentation attributes are emitted (no CSS) so the output
//! rasterizes identically with `resvg`.

use crate::layout::PositionMap;
use crate::model::Bounds;
use crate::text::{TextMeasurer, TextStyle};
use bowtie_core::{Category, Diagram, Node, NodeShape, StyleConfig};
use std::fmt::Write as _;

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Root `id`; also prefixes marker ids. Sanitized before use.
    pub diagram_id: Option<String>,
    /// Minimum pixels per horizontal layout unit. Widened when labels would collide.
    pub unit_x: f64,
    /// Minimum pixels per vertical layout unit (one row).
    pub unit_y: f64,
    pub viewbox_padding: f64,
    /// Space between a label and the node outline.
    pub node_padding: f64,
    pub min_node_size: f64,
    /// Minimum horizontal gap between two connected nodes.
    pub column_gap: f64,
    /// Minimum vertical gap between two rows of the same column.
    pub row_gap: f64,
    pub edge_color: String,
    pub edge_width: f64,
    pub node_stroke: Option<String>,
    pub label_color: String,
    pub text_style: TextStyle,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            diagram_id: None,
            unit_x: 120.0,
            unit_y: 72.0,
            viewbox_padding: 16.0,
            node_padding: 10.0,
            min_node_size: 56.0,
            column_gap: 48.0,
            row_gap: 12.0,
            edge_color: "gray".to_string(),
            edge_width: 1.5,
            node_stroke: None,
            label_color: "#000000".to_string(),
            text_style: TextStyle::default(),
        }
    }
}

/// Turns a caller-supplied name into the root `id`, which also prefixes the marker and title ids.
///
/// Runs of anything other than ASCII letters, digits and `_` become a single `-`, so the result is
/// usable unescaped in `url(#...)` references and CSS selectors. An id that does not start with a
/// letter gets a `bowtie-` prefix.
pub fn sanitize_svg_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut separator = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if separator && !out.is_empty() {
                out.push('-');
            }
            separator = false;
            out.push(ch);
        } else {
            separator = true;
        }
    }
    match out.chars().next() {
        None => "bowtie".to_string(),
        Some(c) if c.is_ascii_alphabetic() => out,
        Some(_) => format!("bowtie-{out}"),
    }
}

/// Pixel geometry of one node: center and half extents.
#[derive(Debug, Clone)]
struct NodeBox<'a> {
    node: &'a Node,
    cx: f64,
    cy: f64,
    hw: f64,
    hh: f64,
}

fn node_half_extents(shape: NodeShape, text_w: f64, text_h: f64, pad: f64, min: f64) -> (f64, f64) {
    let a = text_w / 2.0 + pad;
    let b = text_h / 2.0 + pad;
    let m = min / 2.0;
    match shape {
        NodeShape::Square => (a.max(m), b.max(m)),
        NodeShape::Circle => {
            let r = a.hypot(b).max(m);
            (r, r)
        }
        // |x|/hw + |y|/hh <= 1 holds at the label corners for hw = 1.5a, hh = 3b.
        NodeShape::Diamond => ((1.5 * a).max(m), (3.0 * b).max(m)),
        // Triangles cannot enclose a wide label without becoming huge; the label overlays.
        NodeShape::TriangleUp | NodeShape::TriangleDown => ((1.5 * a).max(m), (1.8 * b).max(m)),
    }
}

/// Outline vertices relative to the node center (SVG y axis, pointing down).
fn outline(shape: NodeShape, hw: f64, hh: f64) -> Option<Vec<(f64, f64)>> {
    match shape {
        NodeShape::Square => Some(vec![(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]),
        NodeShape::Circle => None,
        NodeShape::Diamond => Some(vec![(0.0, -hh), (hw, 0.0), (0.0, hh), (-hw, 0.0)]),
        NodeShape::TriangleUp => Some(vec![(0.0, -hh), (hw, hh), (-hw, hh)]),
        NodeShape::TriangleDown => Some(vec![(0.0, hh), (hw, -hh), (-hw, -hh)]),
    }
}

fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

/// Distance from the node center to its outline along the unit direction `d`.
fn exit_distance(shape: NodeShape, hw: f64, hh: f64, d: (f64, f64)) -> f64 {
    let Some(poly) = outline(shape, hw, hh) else {
        return hw;
    };
    let mut best = f64::INFINITY;
    for i in 0..poly.len() {
        let p = poly[i];
        let q = poly[(i + 1) % poly.len()];
        let e = (q.0 - p.0, q.1 - p.1);
        let denom = cross(d, e);
        if denom.abs() < 1e-12 {
            continue;
        }
        let t = cross(p, e) / denom;
        let u = cross(p, d) / denom;
        if t > 0.0 && (-1e-9..=1.0 + 1e-9).contains(&u) {
            best = best.min(t);
        }
    }
    if best.is_finite() { best } else { 0.0 }
}

fn category_class(category: Category) -> &'static str {
    match category {
        Category::Threat => "threats",
        Category::Hazard => "hazard",
        Category::Consequence => "consequences",
    }
}

fn write_shape(out: &mut String, b: &NodeBox<'_>, shape: NodeShape) {
    let id = escape_attr(&b.node.id.key());
    match outline(shape, b.hw, b.hh) {
        None => {
            let _ = write!(
                out,
                r#"<circle class="node" data-id="{id}" cx="{cx}" cy="{cy}" r="{r}"/>"#,
                cx = fmt(b.cx),
                cy = fmt(b.cy),
                r = fmt(b.hw)
            );
        }
        Some(_) if shape == NodeShape::Square => {
            let _ = write!(
                out,
                r#"<rect class="node" data-id="{id}" x="{x}" y="{y}" width="{w}" height="{h}"/>"#,
                x = fmt(b.cx - b.hw),
                y = fmt(b.cy - b.hh),
                w = fmt(b.hw * 2.0),
                h = fmt(b.hh * 2.0)
            );
        }
        Some(poly) => {
            let _ = write!(out, r#"<polygon class="node" data-id="{id}" points=""#);
            for (idx, (x, y)) in poly.iter().enumerate() {
                if idx > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{},{}", fmt(b.cx + x), fmt(b.cy + y));
            }
            out.push_str(r#""/>"#);
        }
    }
}

/// Renders `diagram` at `positions` as a standalone SVG document.
///
/// # Panics
///
/// Panics when `positions` does not cover every node of `diagram`.
pub fn render_bowtie_svg(
    diagram: &Diagram,
    positions: &PositionMap,
    style: &StyleConfig,
    measurer: &dyn TextMeasurer,
    options: &SvgRenderOptions,
) -> String {
    let shape = style.node_shape;
    let text_style = &options.text_style;
    let line_height = measurer.line_height(text_style);

    let mut boxes: Vec<NodeBox<'_>> = diagram
        .nodes()
        .map(|node| {
            let m = measurer.measure(node.label(), text_style);
            let (hw, hh) = node_half_extents(
                shape,
                m.width,
                m.height,
                options.node_padding.max(0.0),
                options.min_node_size.max(0.0),
            );
            NodeBox {
                node,
                cx: 0.0,
                cy: 0.0,
                hw,
                hh,
            }
        })
        .collect();

    // Scale layout units to pixels so neighbours never overlap.
    let by_id = |id: &bowtie_core::NodeId| boxes.iter().position(|b| &b.node.id == id);
    let mut ux = options.unit_x.max(1.0);
    for e in diagram.edges() {
        let (Some(i), Some(j)) = (by_id(&e.from), by_id(&e.to)) else {
            continue;
        };
        let dx = (positions[&e.from].x - positions[&e.to].x).abs();
        if dx > 1e-9 {
            ux = ux.max((boxes[i].hw + boxes[j].hw + options.column_gap) / dx);
        }
    }
    let max_side_hh = boxes
        .iter()
        .filter(|b| b.node.category() != Category::Hazard)
        .map(|b| b.hh)
        .fold(0.0_f64, f64::max);
    let uy = options.unit_y.max(1.0).max(max_side_hh * 2.0 + options.row_gap);

    let layout_bounds = positions.bounds().unwrap_or(Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 0.0,
        max_y: 0.0,
    });
    for b in &mut boxes {
        let p = positions[&b.node.id];
        b.cx = (p.x - layout_bounds.min_x) * ux;
        b.cy = (layout_bounds.max_y - p.y) * uy;
    }

    let extents = boxes.iter().flat_map(|b| {
        [
            (b.cx - b.hw, b.cy - b.hh),
            (b.cx + b.hw, b.cy + b.hh),
        ]
    });
    let bounds = Bounds::from_points(extents).unwrap_or(Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 100.0,
        max_y: 100.0,
    });
    let pad = options.viewbox_padding.max(0.0);
    let vb_min_x = bounds.min_x - pad;
    let vb_min_y = bounds.min_y - pad;
    let vb_w = (bounds.width() + pad * 2.0).max(1.0);
    let vb_h = (bounds.height() + pad * 2.0).max(1.0);

    let diagram_id = sanitize_svg_id(options.diagram_id.as_deref().unwrap_or("bowtie"));
    let diagram_id_esc = escape_attr(&diagram_id);
    let marker_id = format!("{diagram_id_esc}-arrowhead");

    let mut out = String::new();
    let _ = write!(
        &mut out,
        r#"<svg id="{diagram_id_esc}" width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg" viewBox="{min_x} {min_y} {w} {h}" style="max-width: {w}px; background-color: white;" role="graphics-document document" aria-roledescription="bowtie" aria-labelledby="chart-title-{diagram_id_esc}">"#,
        min_x = fmt(vb_min_x),
        min_y = fmt(vb_min_y),
        w = fmt(vb_w),
        h = fmt(vb_h),
    );
    let _ = write!(
        &mut out,
        r#"<title id="chart-title-{diagram_id_esc}">{}</title>"#,
        escape_xml(diagram.hazard().label())
    );
    let _ = write!(
        &mut out,
        r#"<defs><marker id="{marker_id}" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse"><path d="M0,0L10,5L0,10z" fill="{fill}"/></marker></defs>"#,
        fill = escape_attr(&options.edge_color)
    );

    let _ = write!(
        &mut out,
        r#"<g class="edges" fill="none" stroke="{stroke}" stroke-width="{sw}">"#,
        stroke = escape_attr(&options.edge_color),
        sw = fmt(options.edge_width)
    );
    for e in diagram.edges() {
        let (Some(i), Some(j)) = (
            boxes.iter().position(|b| b.node.id == e.from),
            boxes.iter().position(|b| b.node.id == e.to),
        ) else {
            continue;
        };
        let (from, to) = (&boxes[i], &boxes[j]);
        let (dx, dy) = (to.cx - from.cx, to.cy - from.cy);
        let len = dx.hypot(dy);
        let (mut x1, mut y1, mut x2, mut y2) = (from.cx, from.cy, to.cx, to.cy);
        if len > 1e-9 {
            let d = (dx / len, dy / len);
            let start = exit_distance(shape, from.hw, from.hh, d);
            let end = exit_distance(shape, to.hw, to.hh, (-d.0, -d.1));
            if start + end < len {
                x1 = from.cx + d.0 * start;
                y1 = from.cy + d.1 * start;
                x2 = to.cx - d.0 * end;
                y2 = to.cy - d.1 * end;
            }
        }
        let _ = write!(
            &mut out,
            r#"<line class="edge" data-from="{f}" data-to="{t}" x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" marker-end="url(#{marker_id})"/>"#,
            f = escape_attr(&e.from.key()),
            t = escape_attr(&e.to.key()),
            x1 = fmt(x1),
            y1 = fmt(y1),
            x2 = fmt(x2),
            y2 = fmt(y2),
        );
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="nodes">"#);
    for category in [Category::Threat, Category::Hazard, Category::Consequence] {
        let _ = write!(
            &mut out,
            r#"<g class="{class}" data-shape="{shape}" fill="{fill}""#,
            class = category_class(category),
            shape = shape.name(),
            fill = escape_attr(style.color_for(category))
        );
        if let Some(stroke) = options.node_stroke.as_deref() {
            let _ = write!(&mut out, r#" stroke="{}""#, escape_attr(stroke));
        }
        out.push('>');
        for b in boxes.iter().filter(|b| b.node.category() == category) {
            write_shape(&mut out, b, shape);
        }
        out.push_str("</g>");
    }
    out.push_str("</g>");

    let _ = write!(
        &mut out,
        r#"<g class="labels" fill="{fill}" font-family="{family}" font-size="{size}" font-weight="{weight}" text-anchor="middle">"#,
        fill = escape_attr(&options.label_color),
        family = escape_attr(
            text_style
                .font_family
                .as_deref()
                .unwrap_or("Arial, Helvetica, sans-serif")
        ),
        size = fmt(text_style.font_size),
        weight = escape_attr(text_style.font_weight.as_deref().unwrap_or("normal")),
    );
    for b in &boxes {
        let lines: Vec<&str> = b.node.label().split('\n').map(str::trim).collect();
        let n = lines.len() as f64;
        let _ = write!(
            &mut out,
            r#"<text class="label" data-id="{id}" x="{x}" y="{y}" dominant-baseline="central">"#,
            id = escape_attr(&b.node.id.key()),
            x = fmt(b.cx),
            y = fmt(b.cy)
        );
        for (idx, line) in lines.iter().enumerate() {
            let dy = if idx == 0 {
                -(n - 1.0) / 2.0 * line_height
            } else {
                line_height
            };
            let _ = write!(
                &mut out,
                r#"<tspan x="{x}" dy="{dy}">{text}</tspan>"#,
                x = fmt(b.cx),
                dy = fmt(dy),
                text = escape_xml(line)
            );
        }
        out.push_str("</text>");
    }
    out.push_str("</g>");

    out.push_str("</svg>\n");
    tracing::debug!(
        nodes = boxes.len(),
        edges = diagram.edges().len(),
        width = vb_w,
        height = vb_h,
        "rendered bowtie svg"
    );
    out
}

fn fmt(v: f64) -> String {
    // Round-trippable decimal form without `-0` and tiny float noise.
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    } else {
        v = (v * 1000.0).round() / 1000.0;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            ch if is_xml_forbidden(ch) => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// XML 1.0 has no representation for these, not even as character references.
fn is_xml_forbidden(ch: char) -> bool {
    matches!(
        ch,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

fn escape_attr(text: &str) -> String {
    // Attribute values only need XML escaping; no URL encoding here.
    escape_xml(text)
}
