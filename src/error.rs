//! 核心流程的错误分类

use std::time::Duration;

use thiserror::Error;

use crate::types::section::SectionId;

/// 表单输入错误，生成流程开始前即被拒绝
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("project title must not be empty")]
    EmptyTitle,
    #[error("problem statement must not be empty")]
    EmptyProblemStatement,
    #[error("unknown project type: {0}")]
    UnknownProjectType(String),
    #[error("unknown section: {0}")]
    UnknownSection(String),
}

/// 推理服务错误，全部可在本地恢复（回退到模板）
#[derive(Debug, Error)]
pub enum InferenceError {
    /// 模型服务无法初始化
    #[error("inference service unavailable: {0}")]
    Unavailable(String),
    #[error("inference call timed out after {0:?}")]
    Timeout(Duration),
    #[error("inference request failed: {0}")]
    Request(String),
    #[error("inference service returned an empty response")]
    EmptyResponse,
    /// 模型会话已释放
    #[error("model session has been disposed")]
    Disposed,
}

/// 图表解析与渲染错误，只影响对应的图表块
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiagramError {
    #[error("diagram syntax error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("diagram renderer failed: {0}")]
    Render(String),
}

impl DiagramError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        DiagramError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// 文档导出错误，不影响内存中的文档，可重试
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("document is missing section `{0}`")]
    IncompleteDocument(SectionId),
    #[error("failed to write export artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to build document archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("export task aborted: {0}")]
    Task(String),
}
