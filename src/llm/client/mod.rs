//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::error::InferenceError;
use crate::generator::prompt::SYSTEM_PROMPT;
use crate::llm::{GenerationOptions, TextGenerator};

mod providers;
pub mod utils;

use providers::ProviderClient;
use utils::evaluate_befitting_model;

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        info!(provider = %self.config.provider, "checking model connection");
        let options = GenerationOptions {
            max_new_tokens: 8,
            temperature: 0.0,
            sample: false,
        };
        let (model, _) = evaluate_befitting_model(&self.config);
        match self.prompt_with_model(&model, "Hello", &options).await {
            Ok(_) => {
                info!("model connection ok");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "model connection failed");
                Err(e)
            }
        }
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    warn!(
                        attempt = retries,
                        max_attempts = max_retries,
                        error = %err,
                        "model call failed"
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// 单轮生成，首选模型多次失败后切换到兜底模型
    pub async fn prompt(&self, user_prompt: &str, options: &GenerationOptions) -> Result<String> {
        let (befitting_model, fallover_model) = evaluate_befitting_model(&self.config);

        match self
            .prompt_with_model(&befitting_model, user_prompt, options)
            .await
        {
            Ok(text) => Ok(text),
            Err(e) => match fallover_model {
                Some(model) => {
                    warn!(
                        model = %model,
                        error = %e,
                        "primary model exhausted retries, switching to fall-over model"
                    );
                    self.prompt_with_model(&model, user_prompt, options).await
                }
                None => Err(e),
            },
        }
    }

    async fn prompt_with_model(
        &self,
        model: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let agent = self.client.create_agent(model, SYSTEM_PROMPT, options)?;

        self.retry_with_backoff(|| async { agent.prompt(user_prompt).await })
            .await
    }
}

#[async_trait]
impl TextGenerator for LLMClient {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, InferenceError> {
        let text = self
            .prompt(prompt, options)
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(text)
    }
}
