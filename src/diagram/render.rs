use async_trait::async_trait;
use svg::Document;
use svg::node::element::{
    Circle, Definitions, Ellipse, Group, Marker, Path, Polygon, Rectangle, Text,
};

use crate::diagram::layout::{Layout, LayoutEdge, LayoutNode, layout};
use crate::diagram::parser::{EdgeStyle, NodeShape, parse};
use crate::diagram::{DiagramRenderer, RenderedDiagram};
use crate::error::DiagramError;

const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";
const FONT_SIZE: f32 = 13.0;
const STROKE: &str = "#33475b";
const FILL: &str = "#eef3fb";
const ARROW_MARKER_ID: &str = "flow-arrow";

/// 内置的 SVG 渲染器：解析、布局并生成 SVG 文本
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgDiagramRenderer;

#[async_trait]
impl DiagramRenderer for SvgDiagramRenderer {
    async fn render(&self, source: &str) -> Result<RenderedDiagram, DiagramError> {
        let chart = parse(source)?;
        Ok(render_svg(&layout(&chart)))
    }
}

/// 把布局结果渲染为 SVG 文档
pub fn render_svg(layout: &Layout) -> RenderedDiagram {
    let mut doc = Document::new()
        .set("viewBox", format!("0 0 {} {}", layout.width, layout.height))
        .set("width", layout.width)
        .set("height", layout.height)
        .set("font-family", FONT_FAMILY)
        .set("font-size", FONT_SIZE);

    doc = doc.add(marker_definitions());

    let mut edges = Group::new().set("class", "edges");
    for edge in &layout.edges {
        edges = edges.add(render_edge(layout, edge));
    }

    let mut nodes = Group::new().set("class", "nodes");
    for node in &layout.nodes {
        nodes = nodes.add(render_node(node));
    }

    doc = doc.add(edges).add(nodes);

    RenderedDiagram {
        svg: doc.to_string(),
        width: layout.width,
        height: layout.height,
    }
}

fn marker_definitions() -> Definitions {
    let arrow = Marker::new()
        .set("id", ARROW_MARKER_ID)
        .set("viewBox", "0 0 10 10")
        .set("refX", 9)
        .set("refY", 5)
        .set("markerWidth", 7)
        .set("markerHeight", 7)
        .set("orient", "auto")
        .add(
            Path::new()
                .set("d", "M 0 0 L 10 5 L 0 10 z")
                .set("fill", STROKE),
        );
    Definitions::new().add(arrow)
}

fn render_node(node: &LayoutNode) -> Group {
    let left = node.x - node.width / 2.0;
    let top = node.y - node.height / 2.0;

    let group = Group::new().set("class", "node");
    let group = match node.shape {
        NodeShape::Rectangle | NodeShape::Rounded => {
            let radius = if node.shape == NodeShape::Rounded { 12.0 } else { 2.0 };
            group.add(
                Rectangle::new()
                    .set("x", left)
                    .set("y", top)
                    .set("width", node.width)
                    .set("height", node.height)
                    .set("rx", radius)
                    .set("fill", FILL)
                    .set("stroke", STROKE)
                    .set("stroke-width", 1.5),
            )
        }
        NodeShape::Diamond => {
            let points = format!(
                "{},{} {},{} {},{} {},{}",
                node.x,
                top,
                left + node.width,
                node.y,
                node.x,
                top + node.height,
                left,
                node.y
            );
            group.add(
                Polygon::new()
                    .set("points", points)
                    .set("fill", FILL)
                    .set("stroke", STROKE)
                    .set("stroke-width", 1.5),
            )
        }
        NodeShape::Circle => group.add(
            Circle::new()
                .set("cx", node.x)
                .set("cy", node.y)
                .set("r", node.width / 2.0)
                .set("fill", FILL)
                .set("stroke", STROKE)
                .set("stroke-width", 1.5),
        ),
        NodeShape::Cylinder => {
            let rim = 8.0;
            let body = format!(
                "M {} {} L {} {} A {} {} 0 0 0 {} {} L {} {}",
                left,
                top + rim,
                left,
                top + node.height - rim,
                node.width / 2.0,
                rim,
                left + node.width,
                top + node.height - rim,
                left + node.width,
                top + rim
            );
            group
                .add(
                    Path::new()
                        .set("d", body)
                        .set("fill", FILL)
                        .set("stroke", STROKE)
                        .set("stroke-width", 1.5),
                )
                .add(
                    Ellipse::new()
                        .set("cx", node.x)
                        .set("cy", top + rim)
                        .set("rx", node.width / 2.0)
                        .set("ry", rim)
                        .set("fill", FILL)
                        .set("stroke", STROKE)
                        .set("stroke-width", 1.5),
                )
        }
    };

    group.add(
        Text::new(node.label.as_str())
            .set("x", node.x)
            .set("y", node.y)
            .set("text-anchor", "middle")
            .set("dominant-baseline", "middle")
            .set("fill", STROKE),
    )
}

fn render_edge(layout: &Layout, edge: &LayoutEdge) -> Group {
    let source = &layout.nodes[edge.from];
    let target = &layout.nodes[edge.to];
    let mut group = Group::new().set("class", "edge");

    let data = if edge.from == edge.to {
        // 自环画在节点右侧
        let x = source.x + source.width / 2.0;
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            x,
            source.y - 8.0,
            x + 30.0,
            source.y - 24.0,
            x + 30.0,
            source.y + 24.0,
            x,
            source.y + 8.0
        )
    } else {
        let start = boundary_point(source, target.x, target.y);
        let end = boundary_point(target, source.x, source.y);
        format!("M {} {} L {} {}", start.0, start.1, end.0, end.1)
    };

    let (width, dash) = match edge.style {
        EdgeStyle::Solid => (1.5, None),
        EdgeStyle::Dotted => (1.5, Some("4 3")),
        EdgeStyle::Thick => (3.0, None),
    };
    let mut path = Path::new()
        .set("d", data)
        .set("fill", "none")
        .set("stroke", STROKE)
        .set("stroke-width", width);
    if let Some(dash) = dash {
        path = path.set("stroke-dasharray", dash);
    }
    if edge.directed {
        path = path.set("marker-end", format!("url(#{})", ARROW_MARKER_ID));
    }
    group = group.add(path);

    if let Some(label) = &edge.label {
        let x = (source.x + target.x) / 2.0;
        let y = (source.y + target.y) / 2.0;
        let width = label.chars().count() as f32 * 6.5 + 10.0;
        group = group
            .add(
                Rectangle::new()
                    .set("x", x - width / 2.0)
                    .set("y", y - 9.0)
                    .set("width", width)
                    .set("height", 18.0)
                    .set("fill", "white"),
            )
            .add(
                Text::new(label.as_str())
                    .set("x", x)
                    .set("y", y)
                    .set("text-anchor", "middle")
                    .set("dominant-baseline", "middle")
                    .set("font-size", FONT_SIZE - 2.0),
            );
    }

    group
}

/// 从节点中心指向 (toward_x, toward_y) 的射线与节点外框的交点
fn boundary_point(node: &LayoutNode, toward_x: f32, toward_y: f32) -> (f32, f32) {
    let dx = toward_x - node.x;
    let dy = toward_y - node.y;
    if dx == 0.0 && dy == 0.0 {
        return (node.x, node.y);
    }
    let half_w = node.width / 2.0;
    let half_h = node.height / 2.0;
    let scale = match node.shape {
        NodeShape::Circle => half_w / (dx * dx + dy * dy).sqrt(),
        NodeShape::Diamond => 1.0 / (dx.abs() / half_w + dy.abs() / half_h),
        _ => {
            let sx = if dx == 0.0 { f32::INFINITY } else { half_w / dx.abs() };
            let sy = if dy == 0.0 { f32::INFINITY } else { half_h / dy.abs() };
            sx.min(sy)
        }
    };
    (node.x + dx * scale, node.y + dy * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_produces_svg() {
        let rendered = SvgDiagramRenderer
            .render("graph TD\nA[Client] -->|request| B((Server))\nB -.-> C[(Store)]\nC --> C")
            .await
            .unwrap();
        assert!(rendered.svg.starts_with("<svg"));
        assert!(rendered.svg.contains("Client"));
        assert!(rendered.svg.contains("Server"));
        assert!(rendered.svg.contains("request"));
        assert!(rendered.svg.contains("marker-end"));
        assert!(rendered.width > 0.0 && rendered.height > 0.0);
    }

    #[tokio::test]
    async fn test_render_reports_parse_errors() {
        let result = SvgDiagramRenderer.render("pie\n\"a\": 1").await;
        assert!(matches!(result, Err(DiagramError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_boundary_point_on_rectangle_edge() {
        let node = LayoutNode {
            label: "A".to_string(),
            shape: NodeShape::Rectangle,
            x: 100.0,
            y: 100.0,
            width: 80.0,
            height: 40.0,
            layer: 0,
        };
        assert_eq!(boundary_point(&node, 100.0, 300.0), (100.0, 120.0));
        assert_eq!(boundary_point(&node, 300.0, 100.0), (140.0, 100.0));
    }
}
