use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::InferenceError;
use crate::generator::templates::TemplateLibrary;
use crate::llm::{GenerationOptions, ModelSession, ProviderLoader, TextGenerator};
use crate::notify::{ConsoleSink, StatusSink};
use crate::types::SectionId;

/// 生成与重新生成共享的上下文
#[derive(Clone)]
pub struct GeneratorContext {
    /// 配置
    pub config: Config,
    /// 模型会话，离线模式下为空
    pub session: Option<Arc<ModelSession>>,
    /// 回退模板库
    pub templates: Arc<TemplateLibrary>,
    /// 状态通知接收端
    pub sink: Arc<dyn StatusSink>,
}

impl GeneratorContext {
    /// 根据配置创建上下文，模型会话在首次使用时才初始化
    pub fn new(config: Config) -> Self {
        let session = if config.offline {
            None
        } else {
            let loader = ProviderLoader::new(config.llm.clone());
            let init_timeout = Duration::from_secs(config.llm.timeout_seconds.max(1));
            Some(Arc::new(ModelSession::new(loader, init_timeout)))
        };

        Self {
            config,
            session,
            templates: Arc::new(TemplateLibrary::builtin()),
            sink: Arc::new(ConsoleSink),
        }
    }

    /// 使用现成的生成器，主要供嵌入方与测试使用
    pub fn with_generator(config: Config, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            config,
            session: Some(Arc::new(ModelSession::ready(generator))),
            templates: Arc::new(TemplateLibrary::builtin()),
            sink: Arc::new(ConsoleSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    /// 获取推理句柄
    pub async fn acquire_generator(&self) -> Result<Arc<dyn TextGenerator>, InferenceError> {
        match &self.session {
            Some(session) => session.acquire().await,
            None => Err(InferenceError::Unavailable("offline mode".to_string())),
        }
    }

    /// 单次推理调用的超时时间
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.config.llm.timeout_seconds.max(1))
    }

    /// 章节的采样参数
    pub fn options_for(&self, section: SectionId) -> GenerationOptions {
        let max_new_tokens = match section {
            SectionId::Abstract => 150,
            SectionId::Results | SectionId::Conclusion => 180,
            _ => 200,
        };
        GenerationOptions {
            max_new_tokens,
            temperature: self.config.llm.temperature.unwrap_or(0.7),
            sample: true,
        }
    }

    /// 释放模型会话
    pub async fn shutdown(&self) {
        if let Some(session) = &self.session {
            session.dispose().await;
        }
    }
}
