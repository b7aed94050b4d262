use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExportError;
use crate::export::{DocumentExporter, ExportFormat, ensure_complete};
use crate::types::Document;

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]*").expect("valid regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*|__(.*?)__").expect("valid regex"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]*)`").expect("valid regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

/// 去掉常见的 Markdown 标记，保留文字
pub fn strip_markdown(content: &str) -> String {
    let text = HEADING_MARKER.replace_all(content, "");
    let text = BOLD.replace_all(&text, "$1$2");
    let text = ITALIC.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    text.trim().to_string()
}

/// 纯文本导出：标题，随后是每个章节的大写标题与内容
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExporter {
    pub strip_markdown: bool,
}

impl PlainTextExporter {
    pub fn new(strip_markdown: bool) -> Self {
        Self { strip_markdown }
    }
}

impl DocumentExporter for PlainTextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn serialize(&self, document: &Document) -> Result<Vec<u8>, ExportError> {
        ensure_complete(document)?;

        let mut output = String::new();
        output.push_str(document.title());
        output.push_str("\n\n");
        for (section, content) in document.sections() {
            output.push_str(&section.heading());
            output.push('\n');
            if self.strip_markdown {
                output.push_str(&strip_markdown(content));
            } else {
                output.push_str(content.trim_end());
            }
            output.push_str("\n\n");
        }

        Ok(output.into_bytes())
    }
}
