//! 图表子系统：从 diagrams 章节提取 mermaid 代码块，解析、布局并渲染为 SVG
//!
//! 每个代码块的渲染状态由 [`DiagramBoard`] 管理，单个图表失败不影响其他内容。

use std::ops::Range;

use async_trait::async_trait;

use crate::error::DiagramError;

mod layout;
mod parser;
mod render;
mod view;

pub use layout::{Layout, LayoutEdge, LayoutNode, layout};
pub use parser::{Direction, Edge, EdgeStyle, Flowchart, Node, NodeShape, parse};
pub use render::{SvgDiagramRenderer, render_svg};
pub use view::{DiagramBoard, DiagramSlot, RenderJob, RenderOutcome, RenderState};

/// 图表定义语言
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// 文本中的一个图表代码块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// 在所有代码块中的序号
    pub index: usize,
    pub language: String,
    /// 围栏内的图表源码
    pub source: String,
    /// 整个围栏区域（含围栏行）在原文中的字节范围
    pub span: Range<usize>,
}

/// 渲染结果
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDiagram {
    pub svg: String,
    pub width: f32,
    pub height: f32,
}

/// 外部图表渲染服务
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, source: &str) -> Result<RenderedDiagram, DiagramError>;
}

struct Fence {
    marker: char,
    len: usize,
    start: usize,
    body_start: usize,
    is_diagram: bool,
}

/// 提取所有 mermaid 围栏代码块
///
/// 支持 ``` 与 ~~~ 围栏；未闭合的围栏延伸到文本末尾。
pub fn extract_blocks(text: &str) -> Vec<DiagramBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<Fence> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim();

        match &open {
            None => {
                if let Some((marker, len, info)) = fence_opening(trimmed) {
                    let is_diagram = info
                        .split_whitespace()
                        .next()
                        .is_some_and(|lang| lang.eq_ignore_ascii_case(DIAGRAM_LANGUAGE));
                    open = Some(Fence {
                        marker,
                        len,
                        start: line_start,
                        body_start: offset,
                        is_diagram,
                    });
                }
            }
            Some(fence) => {
                if is_fence_close(trimmed, fence.marker, fence.len) {
                    if fence.is_diagram {
                        blocks.push(DiagramBlock {
                            index: blocks.len(),
                            language: DIAGRAM_LANGUAGE.to_string(),
                            source: text[fence.body_start..line_start].to_string(),
                            span: fence.start..offset,
                        });
                    }
                    open = None;
                }
            }
        }
    }

    if let Some(fence) = open
        && fence.is_diagram
    {
        blocks.push(DiagramBlock {
            index: blocks.len(),
            language: DIAGRAM_LANGUAGE.to_string(),
            source: text[fence.body_start.min(text.len())..].to_string(),
            span: fence.start..text.len(),
        });
    }

    blocks
}

fn fence_opening(line: &str) -> Option<(char, usize, &str)> {
    let marker = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = line.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = &line[len..];
    // 反引号围栏的信息串不能再包含反引号
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some((marker, len, info.trim()))
}

fn is_fence_close(line: &str, marker: char, len: usize) -> bool {
    let run = line.chars().take_while(|c| *c == marker).count();
    run >= len && line[run..].trim().is_empty()
}

/// 渲染失败时显示的内联错误卡片
pub fn error_card(error: &DiagramError) -> String {
    format!(
        "<div class=\"diagram-error\">\
         <p class=\"diagram-error-title\">Error rendering diagram</p>\
         <p class=\"diagram-error-hint\">Please check your Mermaid syntax</p>\
         <pre class=\"diagram-error-detail\">{}</pre>\
         </div>",
        escape_html(&error.to_string())
    )
}

/// 渲染完成前的占位内容
pub fn placeholder() -> &'static str {
    "<div class=\"diagram-pending\">Rendering diagram…</div>"
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
