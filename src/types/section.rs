use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::InputError;

/// 报告章节标识，声明顺序即展示与导出顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Abstract,
    Introduction,
    Methodology,
    Implementation,
    Results,
    Conclusion,
    Diagrams,
    References,
}

impl SectionId {
    pub const ALL: [SectionId; 8] = [
        SectionId::Abstract,
        SectionId::Introduction,
        SectionId::Methodology,
        SectionId::Implementation,
        SectionId::Results,
        SectionId::Conclusion,
        SectionId::Diagrams,
        SectionId::References,
    ];

    /// 小写键名，与序列化格式一致
    pub fn key(&self) -> &'static str {
        match self {
            SectionId::Abstract => "abstract",
            SectionId::Introduction => "introduction",
            SectionId::Methodology => "methodology",
            SectionId::Implementation => "implementation",
            SectionId::Results => "results",
            SectionId::Conclusion => "conclusion",
            SectionId::Diagrams => "diagrams",
            SectionId::References => "references",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionId::Abstract => "Abstract",
            SectionId::Introduction => "Introduction",
            SectionId::Methodology => "Methodology",
            SectionId::Implementation => "Implementation",
            SectionId::Results => "Results",
            SectionId::Conclusion => "Conclusion",
            SectionId::Diagrams => "Diagrams",
            SectionId::References => "References",
        }
    }

    /// 导出时使用的大写标题
    pub fn heading(&self) -> String {
        self.title().to_uppercase()
    }

    /// 结构固定的章节，始终由模板库生成
    pub fn is_structural(&self) -> bool {
        matches!(self, SectionId::Diagrams | SectionId::References)
    }

    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for SectionId {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        SectionId::ALL
            .into_iter()
            .find(|section| section.key() == normalized)
            .ok_or_else(|| InputError::UnknownSection(s.to_string()))
    }
}
