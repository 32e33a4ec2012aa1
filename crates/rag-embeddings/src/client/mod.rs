pub mod cohere;
pub mod config;
pub mod http;
pub mod openai;
pub mod request;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;

pub use config::{ProviderConfig, build_session};
pub use request::{EmbeddingBatch, EmbeddingRequest};
pub use retry::{RetryPolicy, Retrying};

/// 网络层错误，与服务商返回的错误区分开
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("dns resolution failed: {0}")]
    Dns(String),
    #[error("connection failed: {0}")]
    Connection(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Provider error: HTTP {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Domain error for '{label}': {message}")]
    Domain { label: String, message: String },
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EmbeddingError {
    pub fn domain(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Domain {
            label: label.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout))
    }

    /// 调用方可以重试的临时性错误
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// 统一向量嵌入接口
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 批量嵌入文本，输出顺序与 `request.inputs()` 一一对应
    async fn embed(&self, request: &EmbeddingRequest) -> EmbeddingResult<EmbeddingBatch>;

    fn name(&self) -> &str;

    /// 构造时配置的模型；单次请求的模型覆盖不会改变它
    fn model(&self) -> &str;

    /// 配置模型的向量维度（未知模型返回 None）
    ///
    /// 请求覆盖了模型时以返回的 [`EmbeddingBatch::model`] 与
    /// [`EmbeddingBatch::dimension`] 为准
    fn dimension(&self) -> Option<usize>;
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<P> {
    async fn embed(&self, request: &EmbeddingRequest) -> EmbeddingResult<EmbeddingBatch> {
        (**self).embed(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    fn dimension(&self) -> Option<usize> {
        (**self).dimension()
    }
}

/// 在调用方给定的超时时间内执行一次嵌入，超时后丢弃进行中的请求
pub async fn embed_with_timeout<P>(
    provider: &P,
    request: &EmbeddingRequest,
    timeout: Duration,
) -> EmbeddingResult<EmbeddingBatch>
where
    P: EmbeddingProvider + ?Sized,
{
    match tokio::time::timeout(timeout, provider.embed(request)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(provider = provider.name(), ?timeout, "嵌入请求超时");
            Err(TransportError::Timeout.into())
        }
    }
}
