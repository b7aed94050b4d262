use crate::error::ExportError;
use crate::export::{DocumentExporter, ExportFormat, ensure_complete};
use crate::types::Document;

/// JSON 导出，可再次读入作为编辑会话的文档
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExporter;

impl DocumentExporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn serialize(&self, document: &Document) -> Result<Vec<u8>, ExportError> {
        ensure_complete(document)?;
        serde_json::to_vec_pretty(document).map_err(|e| ExportError::Io(e.into()))
    }
}
