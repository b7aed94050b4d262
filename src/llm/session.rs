//! 模型会话：只初始化一次、按需获取的推理句柄
//!
//! 生命周期为 `Uninitialized → Ready → Disposed`。初始化失败时回到
//! `Uninitialized` 并返回 [`InferenceError::Unavailable`]，下一次请求会重新尝试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::LLMConfig;
use crate::error::InferenceError;
use crate::llm::{LLMClient, TextGenerator};

/// 负责创建推理句柄
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<Arc<dyn TextGenerator>>;
}

/// 基于配置的 provider 加载器
pub struct ProviderLoader {
    config: LLMConfig,
}

impl ProviderLoader {
    pub fn new(config: LLMConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for ProviderLoader {
    async fn load(&self) -> anyhow::Result<Arc<dyn TextGenerator>> {
        let client = LLMClient::new(self.config.clone())?;
        if self.config.verify_connection {
            client.check_connection().await?;
        }
        Ok(Arc::new(client))
    }
}

/// 已就绪的句柄，直接返回
struct PreparedLoader(Arc<dyn TextGenerator>);

#[async_trait]
impl ModelLoader for PreparedLoader {
    async fn load(&self) -> anyhow::Result<Arc<dyn TextGenerator>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Disposed,
}

enum Slot {
    Uninitialized,
    Ready(Arc<dyn TextGenerator>),
    Disposed,
}

pub struct ModelSession {
    loader: Box<dyn ModelLoader>,
    slot: Mutex<Slot>,
    init_timeout: Duration,
}

impl ModelSession {
    pub fn new(loader: impl ModelLoader + 'static, init_timeout: Duration) -> Self {
        Self {
            loader: Box::new(loader),
            slot: Mutex::new(Slot::Uninitialized),
            init_timeout,
        }
    }

    /// 使用已有的生成器创建一个处于 Ready 状态的会话
    pub fn ready(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            loader: Box::new(PreparedLoader(generator.clone())),
            slot: Mutex::new(Slot::Ready(generator)),
            init_timeout: Duration::from_secs(1),
        }
    }

    pub async fn state(&self) -> SessionState {
        match *self.slot.lock().await {
            Slot::Uninitialized => SessionState::Uninitialized,
            Slot::Ready(_) => SessionState::Ready,
            Slot::Disposed => SessionState::Disposed,
        }
    }

    /// 获取推理句柄，首次调用时初始化
    ///
    /// 初始化期间持有锁，并发调用方会等待同一次初始化结果。
    pub async fn acquire(&self) -> Result<Arc<dyn TextGenerator>, InferenceError> {
        let mut slot = self.slot.lock().await;
        match &*slot {
            Slot::Ready(generator) => return Ok(generator.clone()),
            Slot::Disposed => return Err(InferenceError::Disposed),
            Slot::Uninitialized => {}
        }

        debug!("initializing model session");
        let loaded = match tokio::time::timeout(self.init_timeout, self.loader.load()).await {
            Ok(result) => result.map_err(|e| InferenceError::Unavailable(e.to_string())),
            Err(_) => Err(InferenceError::Unavailable(format!(
                "initialization timed out after {:?}",
                self.init_timeout
            ))),
        };

        match loaded {
            Ok(generator) => {
                info!("model session ready");
                *slot = Slot::Ready(generator.clone());
                Ok(generator)
            }
            Err(e) => {
                warn!(error = %e, "model session initialization failed");
                Err(e)
            }
        }
    }

    /// 释放句柄，之后的获取请求都会失败
    pub async fn dispose(&self) {
        let mut slot = self.slot.lock().await;
        *slot = Slot::Disposed;
        debug!("model session disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate_text(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, InferenceError> {
            Ok(prompt.to_string())
        }
    }

    struct CountingLoader {
        calls: Arc<AtomicUsize>,
        fail_first: bool,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self) -> anyhow::Result<Arc<dyn TextGenerator>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                anyhow::bail!("no acceleration backend");
            }
            Ok(Arc::new(Echo))
        }
    }

    #[tokio::test]
    async fn test_lazy_initialization_happens_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = ModelSession::new(
            CountingLoader {
                calls: calls.clone(),
                fail_first: false,
            },
            Duration::from_secs(1),
        );
        assert_eq!(session.state().await, SessionState::Uninitialized);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        session.acquire().await.unwrap();
        session.acquire().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn test_failed_initialization_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = ModelSession::new(
            CountingLoader {
                calls: calls.clone(),
                fail_first: true,
            },
            Duration::from_secs(1),
        );

        let first = session.acquire().await;
        assert!(matches!(first, Err(InferenceError::Unavailable(_))));
        assert_eq!(session.state().await, SessionState::Uninitialized);

        assert!(session.acquire().await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disposed_session_rejects_acquire() {
        let session = ModelSession::ready(Arc::new(Echo));
        assert_eq!(session.state().await, SessionState::Ready);

        session.dispose().await;
        assert_eq!(session.state().await, SessionState::Disposed);
        assert!(matches!(
            session.acquire().await,
            Err(InferenceError::Disposed)
        ));
    }

    struct HangingLoader;

    #[async_trait]
    impl ModelLoader for HangingLoader {
        async fn load(&self) -> anyhow::Result<Arc<dyn TextGenerator>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Arc::new(Echo))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialization_timeout_reports_unavailable() {
        let session = ModelSession::new(HangingLoader, Duration::from_secs(5));
        let result = session.acquire().await;
        assert!(matches!(result, Err(InferenceError::Unavailable(_))));
    }
}
