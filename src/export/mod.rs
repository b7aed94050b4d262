//! 文档导出
//!
//! 每种格式一个 [`DocumentExporter`]。序列化在阻塞线程池中执行，
//! 失败只发出一条通知，不影响内存中的文档，可以重试。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ExportError;
use crate::notify::{Notification, StatusSink};
use crate::types::Document;

mod docx;
mod html;
mod json;
mod text;

pub use docx::DocxExporter;
pub use html::HtmlExporter;
pub use json::JsonExporter;
pub use text::{PlainTextExporter, strip_markdown};

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    #[serde(rename = "docx")]
    Docx,
    #[serde(rename = "txt")]
    Text,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "json")]
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docx" | "word" => Ok(ExportFormat::Docx),
            "txt" | "text" => Ok(ExportFormat::Text),
            "html" | "htm" => Ok(ExportFormat::Html),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// 文档序列化器
pub trait DocumentExporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn serialize(&self, document: &Document) -> Result<Vec<u8>, ExportError>;
}

/// 导出产物
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// 由标题得到文件名：空白合并为 `_`，路径中不合法的字符替换为 `_`
pub fn artifact_file_name(title: &str, extension: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut pending_separator = false;

    for c in title.trim().chars() {
        if c.is_whitespace() {
            pending_separator = true;
            continue;
        }
        if pending_separator {
            stem.push('_');
            pending_separator = false;
        }
        let hostile = matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            || c.is_control();
        stem.push(if hostile { '_' } else { c });
    }

    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        stem = String::from("report");
    }
    format!("{}.{}", stem, extension)
}

/// 检查文档是否包含全部章节
pub(crate) fn ensure_complete(document: &Document) -> Result<(), ExportError> {
    match document.missing_sections().first() {
        Some(section) => Err(ExportError::IncompleteDocument(*section)),
        None => Ok(()),
    }
}

/// 导出文档
///
/// 序列化失败时发出一条 [`Notification::ExportFailed`] 并返回错误。
pub async fn export_document(
    document: &Document,
    exporter: Arc<dyn DocumentExporter>,
    sink: &dyn StatusSink,
) -> Result<ExportArtifact, ExportError> {
    let format = exporter.format();
    let file_name = artifact_file_name(document.title(), format.extension());

    let snapshot = document.clone();
    let result = match tokio::task::spawn_blocking(move || exporter.serialize(&snapshot)).await {
        Ok(result) => result,
        Err(e) => Err(ExportError::Task(e.to_string())),
    };

    match result {
        Ok(bytes) => {
            info!(file = %file_name, size = bytes.len(), "document serialized");
            Ok(ExportArtifact {
                file_name,
                format,
                bytes,
            })
        }
        Err(e) => {
            warn!(file = %file_name, error = %e, "document export failed");
            sink.notify(Notification::ExportFailed {
                file_name,
                message: e.to_string(),
            });
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingSink;
    use crate::types::SectionId;

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(
            artifact_file_name("Smart Traffic System", "docx"),
            "Smart_Traffic_System.docx"
        );
        assert_eq!(
            artifact_file_name("  Edge \t\n Cache  ", "txt"),
            "Edge_Cache.txt"
        );
        assert_eq!(artifact_file_name("a/b:c", "html"), "a_b_c.html");
        assert_eq!(artifact_file_name("   ", "docx"), "report.docx");
        assert_eq!(artifact_file_name("..", "docx"), "report.docx");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("DOCX".parse::<ExportFormat>(), Ok(ExportFormat::Docx));
        assert_eq!("text".parse::<ExportFormat>(), Ok(ExportFormat::Text));
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Text.to_string(), "txt");
    }

    struct Broken;

    impl DocumentExporter for Broken {
        fn format(&self) -> ExportFormat {
            ExportFormat::Docx
        }

        fn serialize(&self, _document: &Document) -> Result<Vec<u8>, ExportError> {
            Err(ExportError::Io(std::io::Error::other("disk full")))
        }
    }

    struct Panicking;

    impl DocumentExporter for Panicking {
        fn format(&self) -> ExportFormat {
            ExportFormat::Text
        }

        fn serialize(&self, _document: &Document) -> Result<Vec<u8>, ExportError> {
            panic!("serializer crashed");
        }
    }

    #[tokio::test]
    async fn test_failed_export_notifies_once_and_keeps_document() {
        let sink = CollectingSink::new();
        let mut document = Document::new("Smart Traffic System");
        document.set_section(SectionId::Abstract, "content");
        let before = document.clone();

        let result = export_document(&document, Arc::new(Broken), &sink).await;
        assert!(matches!(result, Err(ExportError::Io(_))));
        assert_eq!(document, before);

        let received = sink.take();
        assert_eq!(received.len(), 1);
        assert!(matches!(
            &received[0],
            Notification::ExportFailed { file_name, .. } if file_name == "Smart_Traffic_System.docx"
        ));
    }

    #[tokio::test]
    async fn test_panicking_exporter_is_contained() {
        let sink = CollectingSink::new();
        let document = Document::new("Report");
        let result = export_document(&document, Arc::new(Panicking), &sink).await;
        assert!(matches!(result, Err(ExportError::Task(_))));
        assert_eq!(sink.take().len(), 1);
    }

    #[tokio::test]
    async fn test_export_can_be_retried() {
        let sink = CollectingSink::new();
        let document = Document::new("Report");
        assert!(export_document(&document, Arc::new(Broken), &sink).await.is_err());

        let artifact = export_document(&document, Arc::new(PlainTextExporter::default()), &sink)
            .await
            .unwrap();
        assert_eq!(artifact.file_name, "Report.txt");
        assert_eq!(artifact.format, ExportFormat::Text);
        assert_eq!(sink.take().len(), 1);
    }
}
