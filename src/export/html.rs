//! HTML 预览导出：渲染 Markdown，并在 diagrams 章节内嵌入图表

use std::collections::HashMap;

use crate::diagram::{
    DiagramBoard, RenderState, error_card, escape_html, extract_blocks, layout, parse,
    render_svg,
};
use crate::error::ExportError;
use crate::export::{DocumentExporter, ExportFormat, ensure_complete};
use crate::types::{Document, SectionId};

const STYLE: &str = "body{font-family:Georgia,serif;max-width:52rem;margin:2rem auto;padding:0 1rem;line-height:1.6;color:#1f2933}\
h1{text-align:center}h2{border-bottom:1px solid #d9e2ec;padding-bottom:.25rem}\
.diagram{text-align:center;margin:1rem 0}\
.diagram-error{border:1px solid #f5a3a3;background:#fff1f1;border-radius:.5rem;padding:1rem}\
.diagram-error-title{color:#b42318;margin:0}.diagram-error-hint{color:#d92d20;font-size:.875rem;margin:.25rem 0 0}\
.diagram-error-detail{font-size:.75rem;white-space:pre-wrap}";

/// HTML 预览导出器
#[derive(Debug, Default, Clone)]
pub struct HtmlExporter {
    /// 预先渲染好的图表片段，按代码块序号索引
    fragments: HashMap<usize, String>,
}

impl HtmlExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用看板中已完成的渲染结果；未完成的图表在导出时直接渲染
    pub fn with_board(mut self, board: &DiagramBoard) -> Self {
        for slot in board.slots() {
            if !matches!(slot.state, RenderState::Rendered(_) | RenderState::Failed(_)) {
                continue;
            }
            if let Some(fragment) = board.html_fragment(slot.block.index) {
                self.fragments.insert(slot.block.index, fragment);
            }
        }
        self
    }

    fn diagram_fragment(&self, index: usize, source: &str) -> String {
        if let Some(fragment) = self.fragments.get(&index) {
            return fragment.clone();
        }
        match parse(source) {
            Ok(chart) => format!(
                "<div class=\"diagram\">{}</div>",
                render_svg(&layout(&chart)).svg
            ),
            Err(e) => error_card(&e),
        }
    }

    fn render_section(&self, section: SectionId, content: &str) -> String {
        if section != SectionId::Diagrams {
            return markdown::to_html(content);
        }

        let mut html = String::new();
        let mut cursor = 0;
        for block in extract_blocks(content) {
            html.push_str(&markdown::to_html(&content[cursor..block.span.start]));
            html.push_str(&self.diagram_fragment(block.index, &block.source));
            cursor = block.span.end;
        }
        html.push_str(&markdown::to_html(&content[cursor..]));
        html
    }
}

impl DocumentExporter for HtmlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn serialize(&self, document: &Document) -> Result<Vec<u8>, ExportError> {
        ensure_complete(document)?;

        let title = escape_html(document.title());
        let mut body = String::new();
        for (section, content) in document.sections() {
            body.push_str(&format!(
                "<section id=\"{}\">\n<h2>{}</h2>\n{}\n</section>\n",
                section.key(),
                section.title(),
                self.render_section(section, content)
            ));
        }

        let html = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n"
        );
        Ok(html.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{RenderOutcome, RenderedDiagram};

    fn document() -> Document {
        let mut document = Document::new("Smart <Traffic> System");
        document.set_section(SectionId::Abstract, "Some **bold** text");
        document.set_section(
            SectionId::Diagrams,
            "Overview\n\n```mermaid\ngraph TD\nA[Sensor] --> B[Controller]\n```\n\n```mermaid\nnot a diagram\n```\n",
        );
        document
    }

    fn render(exporter: &HtmlExporter, document: &Document) -> String {
        String::from_utf8(exporter.serialize(document).unwrap()).unwrap()
    }

    #[test]
    fn test_markdown_is_rendered() {
        let html = render(&HtmlExporter::new(), &document());
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<title>Smart &lt;Traffic&gt; System</title>"));
        assert!(html.contains("<section id=\"references\">"));
    }

    #[test]
    fn test_diagrams_are_embedded_or_flagged() {
        let html = render(&HtmlExporter::new(), &document());
        assert!(html.contains("<svg"));
        assert!(html.contains("Sensor"));
        assert!(html.contains("Error rendering diagram"));
        assert!(!html.contains("```mermaid"));
    }

    #[test]
    fn test_board_fragments_take_precedence() {
        let document = document();
        let mut board = DiagramBoard::from_text(document.section(SectionId::Diagrams));
        let job = board.begin_pending().remove(0);
        board.complete(RenderOutcome {
            job,
            result: Ok(RenderedDiagram {
                svg: "<svg id=\"from-board\"></svg>".to_string(),
                width: 1.0,
                height: 1.0,
            }),
        });

        let html = render(&HtmlExporter::new().with_board(&board), &document);
        assert!(html.contains("from-board"));
        // 第二个图表仍在渲染中，导出时直接解析
        assert!(!html.contains("diagram-pending"));
        assert!(html.contains("Error rendering diagram"));
    }

    #[test]
    fn test_unrendered_board_does_not_leave_placeholders() {
        let document = document();
        let board = DiagramBoard::from_text(document.section(SectionId::Diagrams));

        let html = render(&HtmlExporter::new().with_board(&board), &document);
        assert!(!html.contains("diagram-pending"));
        assert!(html.contains("Sensor"));
        assert!(html.contains("Error rendering diagram"));
    }
}
