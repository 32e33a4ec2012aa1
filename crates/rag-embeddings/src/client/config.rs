use std::time::Duration;

use reqwest::Client;

use crate::client::{EmbeddingError, EmbeddingResult, TransportError};

/// 单个服务商的配置
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub credential: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub max_batch_size: Option<usize>,
}

impl ProviderConfig {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            model: None,
            base_url: None,
            timeout: None,
            max_batch_size: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    /// 去掉末尾的 `/`，未配置时使用服务商默认地址
    pub(crate) fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub(crate) fn batch_size_or(&self, default: usize) -> EmbeddingResult<usize> {
        match self.max_batch_size {
            Some(0) => Err(EmbeddingError::config("max_batch_size must be positive")),
            Some(size) => Ok(size),
            None => Ok(default),
        }
    }
}

/// 构建可在多个客户端之间共享的连接池
///
/// `reqwest::Client` 内部是引用计数的，clone 后共用同一个连接池，最后一个引用释放时关闭。
pub fn build_session(timeout: Option<Duration>) -> EmbeddingResult<Client> {
    let mut builder = Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .connect_timeout(Duration::from_secs(10));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| TransportError::Connection(e.to_string()).into())
}
