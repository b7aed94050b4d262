//! 生成引擎：逐章节调用模型，校验结果，失败时回退到模板
//!
//! [`GenerationEngine::generate`] 永不失败，总是返回包含全部章节的文档。

use futures::{StreamExt, stream};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::InferenceError;
use crate::generator::context::GeneratorContext;
use crate::generator::prompt::build_prompt;
use crate::generator::templates::TemplateContext;
use crate::llm::TextGenerator;
use crate::notify::Notification;
use crate::types::{Document, ProjectRequest, SectionId};

/// 章节内容来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Model,
    Fallback,
}

/// 单个章节的生成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub section: SectionId,
    pub content: String,
    pub source: ContentSource,
}

impl GenerationResult {
    pub fn is_from_model(&self) -> bool {
        self.source == ContentSource::Model
    }
}

/// 回退时如何选择模板变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// 总是首个变体，结果可复现
    Primary,
    /// 均匀随机选择
    Random,
}

/// 模型输出被接受所需的最少字符数
pub fn min_chars(section: SectionId) -> usize {
    match section {
        SectionId::Abstract => 50,
        SectionId::Conclusion => 80,
        _ => 100,
    }
}

/// 去掉模型回显的提示词前缀
pub fn strip_prompt_echo<'a>(prompt: &str, output: &'a str) -> &'a str {
    let mut text = output.trim_start();
    if let Some(rest) = text.strip_prefix(prompt.trim()) {
        text = rest;
    } else if let Some((_, cue)) = prompt.rsplit_once("\n\n") {
        // 只回显了末尾的章节提示，如 "Abstract:"
        if let Some(rest) = text.strip_prefix(cue) {
            text = rest;
        }
    }
    text.trim()
}

/// 调用模型生成单个章节，返回通过校验的文本
///
/// 任何推理错误、超时或质量不达标都返回 `None`，由调用方回退。
pub(crate) async fn infer_section(
    context: &GeneratorContext,
    generator: &dyn TextGenerator,
    request: &ProjectRequest,
    section: SectionId,
) -> Option<String> {
    let prompt = build_prompt(request, section);
    let options = context.options_for(section);
    let timeout = context.inference_timeout();

    let output = match tokio::time::timeout(timeout, generator.generate_text(&prompt, &options))
        .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(section = %section, error = %e, "inference failed, using template");
            return None;
        }
        Err(_) => {
            let e = InferenceError::Timeout(timeout);
            warn!(section = %section, error = %e, "inference failed, using template");
            return None;
        }
    };

    let text = strip_prompt_echo(&prompt, &output);
    let required = min_chars(section);
    let length = text.chars().count();
    if length < required {
        debug!(
            section = %section,
            length,
            required,
            "model output rejected as too short"
        );
        return None;
    }

    Some(text.to_string())
}

/// 按策略选择章节的模板内容
pub(crate) fn fallback_content<R: Rng + ?Sized>(
    context: &GeneratorContext,
    template_context: &TemplateContext,
    section: SectionId,
    policy: FallbackPolicy,
    rng: &mut R,
) -> String {
    match policy {
        FallbackPolicy::Primary => context.templates.primary(template_context, section),
        FallbackPolicy::Random => context.templates.choose(template_context, section, rng),
    }
}

pub struct GenerationEngine {
    context: GeneratorContext,
}

impl GenerationEngine {
    pub fn new(context: GeneratorContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &GeneratorContext {
        &self.context
    }

    /// 生成完整文档
    pub async fn generate(&self, request: &ProjectRequest) -> Document {
        let results = self.generate_results(request).await;

        let mut document = Document::for_request(request);
        let mut model_sections = 0;
        for result in results {
            if result.is_from_model() {
                model_sections += 1;
            }
            document.set_section(result.section, result.content);
        }
        let fallback_sections = SectionId::ALL.len() - model_sections;

        info!(model_sections, fallback_sections, "document generated");
        self.context.sink.notify(Notification::GenerationCompleted {
            model_sections,
            fallback_sections,
        });
        document
    }

    /// 按章节顺序返回每个章节的生成结果
    pub async fn generate_results(&self, request: &ProjectRequest) -> Vec<GenerationResult> {
        let generator = match self.context.acquire_generator().await {
            Ok(generator) => Some(generator),
            Err(e) => {
                warn!(error = %e, "inference unavailable, generating from templates");
                self.context.sink.notify(Notification::InferenceUnavailable {
                    reason: e.to_string(),
                });
                None
            }
        };

        let policy = if self.context.config.randomize_fallback {
            FallbackPolicy::Random
        } else {
            FallbackPolicy::Primary
        };
        let template_context = TemplateContext::from_request(request);
        let parallels = self.context.config.llm.max_parallels.max(1);

        // buffered 保证结果按输入顺序返回
        stream::iter(SectionId::ALL)
            .map(|section| {
                let generator = generator.as_deref();
                let template_context = &template_context;
                async move {
                    let inferred = match generator {
                        Some(generator) if !section.is_structural() => {
                            infer_section(&self.context, generator, request, section).await
                        }
                        _ => None,
                    };
                    match inferred {
                        Some(content) => GenerationResult {
                            section,
                            content,
                            source: ContentSource::Model,
                        },
                        None => self.fallback_result(template_context, section, policy),
                    }
                }
            })
            .buffered(parallels)
            .collect()
            .await
    }

    fn fallback_result(
        &self,
        template_context: &TemplateContext,
        section: SectionId,
        policy: FallbackPolicy,
    ) -> GenerationResult {
        debug!(section = %section, "using template content");
        let content = fallback_content(
            &self.context,
            template_context,
            section,
            policy,
            &mut rand::rng(),
        );
        GenerationResult {
            section,
            content,
            source: ContentSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::GenerationOptions;
    use crate::notify::CollectingSink;
    use crate::types::ProjectType;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn request() -> ProjectRequest {
        ProjectRequest::new(
            "Smart Traffic System",
            "Urban congestion reduces quality of life",
            ProjectType::TechnicalProject,
        )
        .unwrap()
    }

    struct Failing;

    #[async_trait]
    impl TextGenerator for Failing {
        async fn generate_text(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, InferenceError> {
            Err(InferenceError::Request("connection refused".to_string()))
        }
    }

    struct Fixed {
        text: String,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(text: impl Into<String>) -> Self {
            Self {
                text: text.into(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate_text(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    struct Echoing;

    #[async_trait]
    impl TextGenerator for Echoing {
        async fn generate_text(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, InferenceError> {
            Ok(format!("{} {}", prompt, "x".repeat(120)))
        }
    }

    struct Hanging;

    #[async_trait]
    impl TextGenerator for Hanging {
        async fn generate_text(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, InferenceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }
    }

    fn engine_with(generator: Arc<dyn TextGenerator>, sink: Arc<CollectingSink>) -> GenerationEngine {
        GenerationEngine::new(
            GeneratorContext::with_generator(Config::default(), generator).with_sink(sink),
        )
    }

    #[tokio::test]
    async fn test_failing_model_yields_template_document() {
        let sink = Arc::new(CollectingSink::new());
        let engine = engine_with(Arc::new(Failing), sink.clone());
        let document = engine.generate(&request()).await;

        let template_context = TemplateContext::from_request(&request());
        for section in SectionId::ALL {
            let content = document.section(section);
            assert!(!content.is_empty(), "{section}");
            assert_eq!(
                content,
                engine.context().templates.primary(&template_context, section)
            );
        }
        assert!(document.section(SectionId::Abstract).contains("urban congestion"));
        assert_eq!(
            sink.take(),
            vec![Notification::GenerationCompleted {
                model_sections: 0,
                fallback_sections: 8,
            }]
        );
    }

    #[tokio::test]
    async fn test_short_output_is_rejected() {
        let sink = Arc::new(CollectingSink::new());
        let engine = engine_with(Arc::new(Fixed::new("too short")), sink);
        let results = engine.generate_results(&request()).await;
        assert!(results.iter().all(|r| r.source == ContentSource::Fallback));
    }

    #[tokio::test]
    async fn test_minimum_length_boundaries() {
        let context = GeneratorContext::with_generator(Config::default(), Arc::new(Failing));
        let cases = [
            (SectionId::Abstract, 49, false),
            (SectionId::Abstract, 50, true),
            (SectionId::Conclusion, 79, false),
            (SectionId::Conclusion, 80, true),
            (SectionId::Methodology, 99, false),
            (SectionId::Methodology, 100, true),
        ];

        for (section, length, accepted) in cases {
            let generator = Fixed::new("a".repeat(length));
            let inferred = infer_section(&context, &generator, &request(), section).await;
            assert_eq!(inferred.is_some(), accepted, "{section} with {length} chars");
            if let Some(text) = inferred {
                assert_eq!(text.chars().count(), length);
            }
        }
    }

    #[tokio::test]
    async fn test_good_output_is_used_for_prose_only() {
        let text = "A detailed body of text that easily exceeds the minimum length required \
                    for every prose section of the generated report.";
        let generator = Arc::new(Fixed::new(format!("  {}  ", text)));
        let sink = Arc::new(CollectingSink::new());
        let engine = engine_with(generator.clone(), sink.clone());
        let document = engine.generate(&request()).await;

        for section in SectionId::ALL {
            if section.is_structural() {
                assert_ne!(document.section(section), text);
            } else {
                assert_eq!(document.section(section), text);
            }
        }
        assert_eq!(generator.calls.load(Ordering::SeqCst), 6);
        assert_eq!(
            sink.take(),
            vec![Notification::GenerationCompleted {
                model_sections: 6,
                fallback_sections: 2,
            }]
        );
    }

    #[tokio::test]
    async fn test_echoed_prompt_is_stripped() {
        let engine = engine_with(Arc::new(Echoing), Arc::new(CollectingSink::new()));
        let document = engine.generate(&request()).await;
        assert_eq!(document.section(SectionId::Methodology), "x".repeat(120));
    }

    #[tokio::test]
    async fn test_offline_notifies_unavailable() {
        let sink = Arc::new(CollectingSink::new());
        let config = Config {
            offline: true,
            ..Config::default()
        };
        let engine = GenerationEngine::new(GeneratorContext::new(config).with_sink(sink.clone()));
        let document = engine.generate(&request()).await;

        assert!(document.is_renderable());
        let received = sink.take();
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0], Notification::InferenceUnavailable { .. }));
        assert_eq!(
            received[1],
            Notification::GenerationCompleted {
                model_sections: 0,
                fallback_sections: 8,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_inference_times_out() {
        let mut config = Config::default();
        config.llm.timeout_seconds = 5;
        let engine = GenerationEngine::new(
            GeneratorContext::with_generator(config, Arc::new(Hanging))
                .with_sink(Arc::new(CollectingSink::new())),
        );
        let results = engine.generate_results(&request()).await;
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.source == ContentSource::Fallback));
    }

    #[test]
    fn test_strip_prompt_echo() {
        let prompt = "Write something.\n\nAbstract:";
        assert_eq!(strip_prompt_echo(prompt, "Write something.\n\nAbstract: body "), "body");
        assert_eq!(strip_prompt_echo(prompt, "Abstract: body"), "body");
        assert_eq!(strip_prompt_echo(prompt, "  body\n"), "body");
    }

    #[test]
    fn test_min_chars_per_section() {
        assert_eq!(min_chars(SectionId::Abstract), 50);
        assert_eq!(min_chars(SectionId::Conclusion), 80);
        assert_eq!(min_chars(SectionId::Results), 100);
    }
}
