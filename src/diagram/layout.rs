//! 分层布局：最长路径分层，按声明顺序在层内排列
//!
//! 环路通过忽略深度优先遍历中的回边来打破。

use crate::diagram::parser::{Direction, EdgeStyle, Flowchart, NodeShape};

const NODE_HEIGHT: f32 = 44.0;
const MIN_NODE_WIDTH: f32 = 80.0;
const CHAR_WIDTH: f32 = 7.5;
const LABEL_PADDING: f32 = 28.0;
const LAYER_GAP: f32 = 70.0;
const NODE_GAP: f32 = 40.0;
pub(crate) const MARGIN: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub label: String,
    pub shape: NodeShape,
    /// 中心点坐标
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub layer: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    pub from: usize,
    pub to: usize,
    pub label: Option<String>,
    pub style: EdgeStyle,
    pub directed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub direction: Direction,
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub width: f32,
    pub height: f32,
}

/// 计算节点位置
pub fn layout(chart: &Flowchart) -> Layout {
    let layers = assign_layers(chart);
    let layer_count = layers.iter().copied().max().map_or(0, |max| max + 1);

    let sizes: Vec<(f32, f32)> = chart
        .nodes
        .iter()
        .map(|node| node_size(&node.label, node.shape))
        .collect();

    // 每层的节点，保持声明顺序
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
    for (index, &layer) in layers.iter().enumerate() {
        members[layer].push(index);
    }

    let horizontal = chart.direction.is_horizontal();
    // 主轴为层的方向，交叉轴为层内排列方向
    let along = |size: (f32, f32)| if horizontal { size.0 } else { size.1 };
    let across = |size: (f32, f32)| if horizontal { size.1 } else { size.0 };

    let layer_depths: Vec<f32> = members
        .iter()
        .map(|layer| {
            layer
                .iter()
                .map(|&i| along(sizes[i]))
                .fold(0.0, f32::max)
        })
        .collect();
    let layer_spans: Vec<f32> = members
        .iter()
        .map(|layer| {
            let total: f32 = layer.iter().map(|&i| across(sizes[i])).sum();
            total + NODE_GAP * layer.len().saturating_sub(1) as f32
        })
        .collect();
    let max_span = layer_spans.iter().copied().fold(0.0, f32::max);
    let total_depth: f32 =
        layer_depths.iter().sum::<f32>() + LAYER_GAP * layer_count.saturating_sub(1) as f32;

    let mut positions = vec![(0.0f32, 0.0f32); chart.nodes.len()];
    let mut depth_offset = MARGIN;
    for (layer_index, layer) in members.iter().enumerate() {
        let depth = layer_depths[layer_index];
        let main = depth_offset + depth / 2.0;
        let mut cross = MARGIN + (max_span - layer_spans[layer_index]) / 2.0;
        for &i in layer {
            let extent = across(sizes[i]);
            positions[i] = (main, cross + extent / 2.0);
            cross += extent + NODE_GAP;
        }
        depth_offset += depth + LAYER_GAP;
    }

    let reversed = matches!(chart.direction, Direction::BottomUp | Direction::RightLeft);
    let full_depth = total_depth + MARGIN * 2.0;

    let nodes = chart
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let (mut main, cross) = positions[i];
            if reversed {
                main = full_depth - main;
            }
            let (x, y) = if horizontal { (main, cross) } else { (cross, main) };
            LayoutNode {
                label: node.label.clone(),
                shape: node.shape,
                x,
                y,
                width: sizes[i].0,
                height: sizes[i].1,
                layer: layers[i],
            }
        })
        .collect();

    let edges = chart
        .edges
        .iter()
        .map(|edge| LayoutEdge {
            from: edge.from,
            to: edge.to,
            label: edge.label.clone(),
            style: edge.style,
            directed: edge.directed,
        })
        .collect();

    let full_span = max_span + MARGIN * 2.0;
    let (width, height) = if horizontal {
        (full_depth, full_span)
    } else {
        (full_span, full_depth)
    };

    Layout {
        direction: chart.direction,
        nodes,
        edges,
        width,
        height,
    }
}

fn node_size(label: &str, shape: NodeShape) -> (f32, f32) {
    let text_width = label.chars().count() as f32 * CHAR_WIDTH + LABEL_PADDING;
    let width = text_width.max(MIN_NODE_WIDTH);
    match shape {
        NodeShape::Circle => (width, width),
        NodeShape::Diamond => (width * 1.4, NODE_HEIGHT * 1.5),
        NodeShape::Cylinder => (width, NODE_HEIGHT + 12.0),
        NodeShape::Rectangle | NodeShape::Rounded => (width, NODE_HEIGHT),
    }
}

/// 最长路径分层，回边不参与
fn assign_layers(chart: &Flowchart) -> Vec<usize> {
    let count = chart.nodes.len();
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); count];
    for edge in &chart.edges {
        if edge.from != edge.to {
            outgoing[edge.from].push(edge.to);
        }
    }

    // 迭代式深度优先遍历得到拓扑序（后序逆序），同时识别回边
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }
    let mut marks = vec![Mark::New; count];
    let mut forward: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut order = Vec::with_capacity(count);

    for root in 0..count {
        if marks[root] != Mark::New {
            continue;
        }
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::Active;
        while let Some((node, next)) = stack.pop() {
            if let Some(&target) = outgoing[node].get(next) {
                stack.push((node, next + 1));
                match marks[target] {
                    Mark::New => {
                        forward[node].push(target);
                        marks[target] = Mark::Active;
                        stack.push((target, 0));
                    }
                    Mark::Done => forward[node].push(target),
                    Mark::Active => {}
                }
            } else {
                marks[node] = Mark::Done;
                order.push(node);
            }
        }
    }
    order.reverse();

    let mut layers = vec![0usize; count];
    for &node in &order {
        for &target in &forward[node] {
            layers[target] = layers[target].max(layers[node] + 1);
        }
    }
    layers
}
