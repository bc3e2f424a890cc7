use bowtie_core::{LayoutConfig, NodeShape, StyleConfig, build_diagram};
use bowtie_render::{
    DeterministicTextMeasurer, PositionMap, SvgRenderOptions, layout_diagram, render_bowtie_svg,
};

fn render(
    threats: &[&str],
    consequences: &[&str],
    hazard: &str,
    style: &StyleConfig,
    options: &SvgRenderOptions,
) -> String {
    let d = build_diagram(threats.iter().copied(), consequences.iter().copied(), hazard);
    let pos = layout_diagram(&d, &LayoutConfig::default());
    render_bowtie_svg(
        &d,
        &pos,
        style,
        &DeterministicTextMeasurer::default(),
        options,
    )
}

fn sample_svg(style: &StyleConfig) -> String {
    render(
        &["Valve Failure", "Pipe Corrosion"],
        &["Fire", "Environmental Spill"],
        "Loss of Containment",
        style,
        &SvgRenderOptions::default(),
    )
}

fn child_groups<'a, 'i>(root: roxmltree::Node<'a, 'i>) -> Vec<roxmltree::Node<'a, 'i>> {
    root.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "g")
        .collect()
}

fn attr_f64(node: roxmltree::Node<'_, '_>, name: &str) -> f64 {
    node.attribute(name)
        .unwrap_or_else(|| panic!("missing {name}"))
        .parse()
        .expect("numeric attribute")
}

#[test]
fn svg_draws_edges_then_nodes_then_labels() {
    let svg = sample_svg(&StyleConfig::default());
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    let root = doc.root_element();
    assert_eq!(root.tag_name().name(), "svg");
    assert_eq!(root.attribute("aria-roledescription"), Some("bowtie"));

    let groups = child_groups(root);
    let classes: Vec<_> = groups.iter().map(|g| g.attribute("class").unwrap()).collect();
    assert_eq!(classes, ["edges", "nodes", "labels"]);

    let edges: Vec<_> = groups[0]
        .children()
        .filter(|n| n.has_tag_name("line"))
        .collect();
    assert_eq!(edges.len(), 4);
    let pairs: Vec<_> = edges
        .iter()
        .map(|e| (e.attribute("data-from").unwrap(), e.attribute("data-to").unwrap()))
        .collect();
    assert_eq!(
        pairs,
        [
            ("threat:Valve Failure", "hazard:Loss of Containment"),
            ("threat:Pipe Corrosion", "hazard:Loss of Containment"),
            ("hazard:Loss of Containment", "consequence:Fire"),
            ("hazard:Loss of Containment", "consequence:Environmental Spill"),
        ]
    );
    for e in &edges {
        assert!(e.attribute("marker-end").unwrap().contains("arrowhead"));
    }

    let labels: Vec<_> = groups[2]
        .children()
        .filter(|n| n.has_tag_name("text"))
        .collect();
    assert_eq!(labels.len(), 5);
}

#[test]
fn nodes_are_grouped_by_category_with_one_fill_each() {
    let style = StyleConfig {
        threat_color: "#112233".to_string(),
        consequence_color: "crimson".to_string(),
        hazard_color: "#ffa500".to_string(),
        node_shape: NodeShape::Square,
    };
    let svg = sample_svg(&style);
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    let nodes = child_groups(doc.root_element())[1];
    let groups = child_groups(nodes);

    let summary: Vec<_> = groups
        .iter()
        .map(|g| {
            let count = g.children().filter(|n| n.is_element()).count();
            (g.attribute("class").unwrap(), g.attribute("fill").unwrap(), count)
        })
        .collect();
    assert_eq!(
        summary,
        [
            ("threats", "#112233", 2),
            ("hazard", "#ffa500", 1),
            ("consequences", "crimson", 2),
        ]
    );
    for g in &groups {
        for shape in g.children().filter(|n| n.is_element()) {
            assert_eq!(shape.tag_name().name(), "rect");
            assert!(shape.attribute("fill").is_none(), "fill comes from the group");
        }
    }
}

#[test]
fn every_shape_option_renders_its_outline() {
    let expected = [
        (NodeShape::Square, "rect"),
        (NodeShape::Circle, "circle"),
        (NodeShape::Diamond, "polygon"),
        (NodeShape::TriangleUp, "polygon"),
        (NodeShape::TriangleDown, "polygon"),
    ];
    for (shape, tag) in expected {
        let style = StyleConfig {
            node_shape: shape,
            ..StyleConfig::default()
        };
        let svg = sample_svg(&style);
        let doc = roxmltree::Document::parse(&svg).expect("valid svg");
        let shapes: Vec<_> = doc
            .descendants()
            .filter(|n| n.attribute("class") == Some("node"))
            .collect();
        assert_eq!(shapes.len(), 5, "{shape}");
        assert!(shapes.iter().all(|n| n.tag_name().name() == tag), "{shape}");
        if shape == NodeShape::Diamond {
            let pts = shapes[0].attribute("points").unwrap();
            assert_eq!(pts.split(' ').count(), 4);
        }
        if matches!(shape, NodeShape::TriangleUp | NodeShape::TriangleDown) {
            let pts = shapes[0].attribute("points").unwrap();
            assert_eq!(pts.split(' ').count(), 3);
        }
    }
}

#[test]
fn threats_render_left_of_hazard_left_of_consequences() {
    let svg = sample_svg(&StyleConfig::default());
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    let x_of = |prefix: &str| -> Vec<f64> {
        doc.descendants()
            .filter(|n| n.has_tag_name("text"))
            .filter(|n| n.attribute("data-id").unwrap().starts_with(prefix))
            .map(|n| attr_f64(n, "x"))
            .collect()
    };
    let threats = x_of("threat:");
    let hazard = x_of("hazard:");
    let consequences = x_of("consequence:");
    assert_eq!(hazard.len(), 1);
    assert!(threats.iter().all(|x| *x < hazard[0]));
    assert!(consequences.iter().all(|x| *x > hazard[0]));

    // The first threat row is drawn above the second.
    let ys: Vec<f64> = doc
        .descendants()
        .filter(|n| n.has_tag_name("text"))
        .filter(|n| n.attribute("data-id").unwrap().starts_with("threat:"))
        .map(|n| attr_f64(n, "y"))
        .collect();
    assert!(ys[0] < ys[1]);
}

#[test]
fn rectangles_do_not_overlap_with_long_labels() {
    let svg = render(
        &[
            "An unusually long threat description that keeps going",
            "Short",
        ],
        &["Another very long consequence label for the right column"],
        "Hazard",
        &StyleConfig::default(),
        &SvgRenderOptions::default(),
    );
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    let mut rects: Vec<(f64, f64)> = doc
        .descendants()
        .filter(|n| n.has_tag_name("rect"))
        .map(|n| {
            let x = attr_f64(n, "x");
            (x, x + attr_f64(n, "width"))
        })
        .collect();
    rects.sort_by(|a, b| a.0.total_cmp(&b.0));
    // Threat column ends before the hazard starts, which ends before the consequence starts.
    let threat_right = rects[0].1.max(rects[1].1);
    let hazard = rects
        .iter()
        .find(|r| r.0 > threat_right)
        .expect("hazard to the right of the threats");
    let consequence = rects.last().unwrap();
    assert!(hazard.1 < consequence.0);
}

#[test]
fn multi_line_hazard_renders_one_tspan_per_line() {
    let svg = render(
        &["A"],
        &["B"],
        "Loss of Containment\nwith hydrocarbon\nspilled to the bund",
        &StyleConfig::default(),
        &SvgRenderOptions::default(),
    );
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    let hazard = doc
        .descendants()
        .find(|n| n.has_tag_name("text") && n.attribute("data-id").unwrap().starts_with("hazard:"))
        .expect("hazard label");
    let lines: Vec<_> = hazard
        .children()
        .filter(|n| n.has_tag_name("tspan"))
        .map(|n| n.text().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        lines,
        ["Loss of Containment", "with hydrocarbon", "spilled to the bund"]
    );
}

#[test]
fn labels_and_colors_are_escaped() {
    let style = StyleConfig {
        threat_color: "\"><script/>".to_string(),
        ..StyleConfig::default()
    };
    let svg = render(
        &["Pump <P-101> & valve"],
        &["Fire"],
        "H",
        &style,
        &SvgRenderOptions::default(),
    );
    assert!(svg.contains("Pump &lt;P-101&gt; &amp; valve"));
    assert!(!svg.contains("<script"));
    roxmltree::Document::parse(&svg).expect("still valid XML");
}

#[test]
fn control_characters_in_labels_keep_the_svg_well_formed() {
    let svg = render(
        &["Valve\u{0B}Failure"],
        &["Fire"],
        "Leak",
        &StyleConfig::default(),
        &SvgRenderOptions::default(),
    );
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    let texts: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name("tspan"))
        .filter_map(|n| n.text().map(str::to_string))
        .collect();
    assert!(texts.iter().any(|t| t == "Valve Failure"), "{texts:?}");
}

#[test]
fn control_characters_in_style_colors_keep_the_svg_well_formed() {
    let style = StyleConfig {
        threat_color: "red\u{0C}".to_string(),
        ..StyleConfig::default()
    };
    let svg = render(&["Valve"], &["Fire"], "Leak", &style, &SvgRenderOptions::default());
    roxmltree::Document::parse(&svg).expect("valid svg");
}

#[test]
fn rendering_is_deterministic() {
    let a = sample_svg(&StyleConfig::default());
    let b = sample_svg(&StyleConfig::default());
    assert_eq!(a, b);
}

#[test]
fn degenerate_bowtie_renders_hazard_only() {
    let svg = render(&[], &[], "Leak", &StyleConfig::default(), &SvgRenderOptions::default());
    let doc = roxmltree::Document::parse(&svg).expect("valid svg");
    assert_eq!(doc.descendants().filter(|n| n.has_tag_name("line")).count(), 0);
    assert_eq!(
        doc.descendants()
            .filter(|n| n.attribute("class") == Some("node"))
            .count(),
        1
    );
    let vb = doc.root_element().attribute("viewBox").unwrap();
    assert_eq!(vb.split_whitespace().count(), 4);
}

#[test]
fn diagram_id_is_sanitized_and_prefixes_marker() {
    let options = SvgRenderOptions {
        diagram_id: Some("risk register #1".to_string()),
        ..SvgRenderOptions::default()
    };
    let svg = render(&["A"], &["B"], "H", &StyleConfig::default(), &options);
    assert!(svg.contains(r#"<svg id="risk-register-1""#));
    assert!(svg.contains(r#"marker id="risk-register-1-arrowhead""#));
    assert!(svg.contains("url(#risk-register-1-arrowhead)"));
}

#[test]
#[should_panic(expected = "no layout position")]
fn missing_position_is_a_contract_breach() {
    let d = build_diagram(["A"], ["B"], "H");
    let other = build_diagram(["Z"], ["B"], "H");
    let pos: PositionMap = layout_diagram(&other, &LayoutConfig::default());
    let _ = render_bowtie_svg(
        &d,
        &pos,
        &StyleConfig::default(),
        &DeterministicTextMeasurer::default(),
        &SvgRenderOptions::default(),
    );
}
