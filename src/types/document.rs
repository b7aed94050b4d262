use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diagram::{DiagramBlock, extract_blocks};
use crate::types::project::ProjectRequest;
use crate::types::section::SectionId;

/// 可编辑的结构化报告
///
/// 每个 [`SectionId`] 始终都有一个条目（可能为空字符串），
/// `BTreeMap` 的遍历顺序即章节的固定顺序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    title: String,
    sections: BTreeMap<SectionId, String>,
    /// 生成该文档的原始请求，用于按章节重新调用模型
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin: Option<ProjectRequest>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        let sections = SectionId::ALL
            .into_iter()
            .map(|section| (section, String::new()))
            .collect();
        Self {
            title: title.into(),
            sections,
            origin: None,
            created_at: Utc::now(),
        }
    }

    /// 由请求创建空文档，并记录来源
    pub fn for_request(request: &ProjectRequest) -> Self {
        let mut document = Self::new(request.title());
        document.origin = Some(request.clone());
        document
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn origin(&self) -> Option<&ProjectRequest> {
        self.origin.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn section(&self, section: SectionId) -> &str {
        self.sections.get(&section).map(String::as_str).unwrap_or("")
    }

    /// 替换章节内容，返回旧内容
    pub fn set_section(&mut self, section: SectionId, content: impl Into<String>) -> String {
        self.sections
            .insert(section, content.into())
            .unwrap_or_default()
    }

    /// 按固定顺序遍历全部章节
    pub fn sections(&self) -> impl Iterator<Item = (SectionId, &str)> {
        self.sections
            .iter()
            .map(|(section, content)| (*section, content.as_str()))
    }

    /// 缺失条目的章节（只会出现在反序列化得到的文档中）
    pub fn missing_sections(&self) -> Vec<SectionId> {
        SectionId::ALL
            .into_iter()
            .filter(|section| !self.sections.contains_key(section))
            .collect()
    }

    /// 补齐缺失的章节条目
    pub fn normalize(&mut self) {
        for section in SectionId::ALL {
            self.sections.entry(section).or_default();
        }
    }

    pub fn is_renderable(&self) -> bool {
        self.missing_sections().is_empty()
    }

    /// 从 diagrams 章节即时解析图表块
    pub fn diagram_blocks(&self) -> Vec<DiagramBlock> {
        extract_blocks(self.section(SectionId::Diagrams))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::project::ProjectType;

    #[test]
    fn test_new_document_has_every_section() {
        let document = Document::new("Report");
        assert!(document.is_renderable());
        let order: Vec<SectionId> = document.sections().map(|(s, _)| s).collect();
        assert_eq!(order, SectionId::ALL.to_vec());
        assert!(document.sections().all(|(_, content)| content.is_empty()));
    }

    #[test]
    fn test_set_section_returns_previous() {
        let mut document = Document::new("Report");
        assert_eq!(document.set_section(SectionId::Results, "first"), "");
        assert_eq!(document.set_section(SectionId::Results, "second"), "first");
        assert_eq!(document.section(SectionId::Results), "second");
    }

    #[test]
    fn test_normalize_repairs_missing_sections() {
        let json = r#"{"title":"Partial","sections":{"abstract":"A"}}"#;
        let mut document: Document = serde_json::from_str(json).unwrap();
        assert_eq!(document.missing_sections().len(), 7);
        assert!(!document.is_renderable());

        document.normalize();
        assert!(document.is_renderable());
        assert_eq!(document.section(SectionId::Abstract), "A");
        assert_eq!(document.section(SectionId::Conclusion), "");
    }

    #[test]
    fn test_for_request_records_origin() {
        let request =
            ProjectRequest::new("Title", "Problem", ProjectType::ResearchPaper).unwrap();
        let document = Document::for_request(&request);
        assert_eq!(document.title(), "Title");
        assert_eq!(document.origin(), Some(&request));
    }
}
