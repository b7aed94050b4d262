//! 面向调用方的状态通知

use std::path::PathBuf;
use std::sync::Mutex;

/// 生成与导出过程中发出的状态通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// 推理服务不可用，整篇文档回退到模板
    InferenceUnavailable { reason: String },
    GenerationCompleted {
        model_sections: usize,
        fallback_sections: usize,
    },
    SectionRegenerated { section: String, from_model: bool },
    DiagramFailed { index: usize, message: String },
    ExportSucceeded { path: PathBuf },
    ExportFailed { file_name: String, message: String },
}

impl Notification {
    pub fn is_error(&self) -> bool {
        matches!(self, Notification::ExportFailed { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Notification::InferenceUnavailable { .. } | Notification::DiagramFailed { .. }
        )
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::InferenceUnavailable { reason } => {
                write!(f, "⚠️ 模型服务不可用，全部章节使用模板内容: {}", reason)
            }
            Notification::GenerationCompleted {
                model_sections,
                fallback_sections,
            } => write!(
                f,
                "✅ 报告生成完成（模型生成 {} 个章节，模板回退 {} 个章节）",
                model_sections, fallback_sections
            ),
            Notification::SectionRegenerated {
                section,
                from_model,
            } => {
                let source = if *from_model { "模型" } else { "模板" };
                write!(f, "🔄 已重新生成章节 {}（{}）", section, source)
            }
            Notification::DiagramFailed { index, message } => {
                write!(f, "⚠️ 图表 #{} 渲染失败: {}", index + 1, message)
            }
            Notification::ExportSucceeded { path } => {
                write!(f, "💾 已导出文档: {}", path.display())
            }
            Notification::ExportFailed { file_name, message } => {
                write!(f, "❌ 导出 {} 失败: {}", file_name, message)
            }
        }
    }
}

/// 通知接收端
pub trait StatusSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// 打印到终端
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            eprintln!("{}", notification);
        } else {
            println!("{}", notification);
        }
    }
}

/// 丢弃所有通知
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl StatusSink for SilentSink {
    fn notify(&self, _notification: Notification) {}
}

/// 收集通知，便于嵌入方轮询或测试断言
#[derive(Debug, Default)]
pub struct CollectingSink {
    received: Mutex<Vec<Notification>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        match self.received.lock() {
            Ok(mut received) => std::mem::take(&mut *received),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl StatusSink for CollectingSink {
    fn notify(&self, notification: Notification) {
        match self.received.lock() {
            Ok(mut received) => received.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
