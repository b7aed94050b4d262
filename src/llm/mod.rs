use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

pub mod client;
pub mod session;

pub use client::LLMClient;
pub use session::{ModelLoader, ModelSession, ProviderLoader, SessionState};

/// 单次推理调用的采样参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub max_new_tokens: u32,
    pub temperature: f64,
    /// 关闭时按贪心解码处理（温度视为 0）
    pub sample: bool,
}

impl GenerationOptions {
    pub fn effective_temperature(&self) -> f64 {
        if self.sample { self.temperature } else { 0.0 }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.7,
            sample: true,
        }
    }
}

/// 外部文本生成服务
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, InferenceError>;
}
