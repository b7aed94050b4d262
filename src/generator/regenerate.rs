//! 单章节重新生成
//!
//! 只返回新内容，不修改文档。结构化章节直接从变体池中挑选；
//! 正文章节在模型可用且文档记录了来源请求时重新调用模型。

use rand::Rng;
use tracing::debug;

use crate::generator::context::GeneratorContext;
use crate::generator::engine::{
    ContentSource, FallbackPolicy, GenerationResult, fallback_content, infer_section,
};
use crate::generator::templates::TemplateContext;
use crate::types::{Document, SectionId};

pub struct SectionRegenerator {
    context: GeneratorContext,
}

impl SectionRegenerator {
    pub fn new(context: GeneratorContext) -> Self {
        Self { context }
    }

    /// 返回章节的新内容
    pub async fn regenerate_section(&self, document: &Document, section: SectionId) -> String {
        self.regenerate(document, section).await.content
    }

    /// 与 [`Self::regenerate_section`] 相同，但由调用方提供随机源
    pub async fn regenerate_section_with_rng<R: Rng + Send + ?Sized>(
        &self,
        document: &Document,
        section: SectionId,
        rng: &mut R,
    ) -> String {
        match self.from_model(document, section).await {
            Some(content) => content,
            None => self.from_templates(document, section, rng),
        }
    }

    /// 重新生成并标明内容来源
    pub async fn regenerate(&self, document: &Document, section: SectionId) -> GenerationResult {
        match self.from_model(document, section).await {
            Some(content) => GenerationResult {
                section,
                content,
                source: ContentSource::Model,
            },
            None => GenerationResult {
                section,
                content: self.from_templates(document, section, &mut rand::rng()),
                source: ContentSource::Fallback,
            },
        }
    }

    async fn from_model(&self, document: &Document, section: SectionId) -> Option<String> {
        if section.is_structural() {
            return None;
        }
        let Some(request) = document.origin() else {
            debug!(section = %section, "document has no origin request, regenerating from templates");
            return None;
        };
        let generator = match self.context.acquire_generator().await {
            Ok(generator) => generator,
            Err(e) => {
                debug!(section = %section, error = %e, "regenerating from templates");
                return None;
            }
        };
        infer_section(&self.context, generator.as_ref(), request, section).await
    }

    fn from_templates<R: Rng + ?Sized>(
        &self,
        document: &Document,
        section: SectionId,
        rng: &mut R,
    ) -> String {
        let template_context = TemplateContext::from_document(document);
        fallback_content(
            &self.context,
            &template_context,
            section,
            FallbackPolicy::Random,
            rng,
        )
    }
}
