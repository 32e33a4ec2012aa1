use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::client::{
    EmbeddingBatch, EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResult,
};

/// 重试策略，由调用方显式指定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        min_backoff: Duration,
        max_backoff: Duration,
    ) -> EmbeddingResult<Self> {
        if max_attempts == 0 {
            return Err(EmbeddingError::config("max_attempts must be at least 1"));
        }
        if min_backoff > max_backoff {
            return Err(EmbeddingError::config(
                "min_backoff must not exceed max_backoff",
            ));
        }
        Ok(Self {
            max_attempts,
            min_backoff,
            max_backoff,
        })
    }

    /// 只尝试一次
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            min_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 在 [min_backoff, max_backoff] 内随机取一个等待时间
    pub fn backoff(&self) -> Duration {
        let min = self.min_backoff.as_millis() as u64;
        let max = self.max_backoff.as_millis() as u64;
        if min == max {
            return self.min_backoff;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// 在任意客户端之上叠加重试，客户端本身从不重试
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: EmbeddingProvider> Retrying<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for Retrying<P> {
    async fn embed(&self, request: &EmbeddingRequest) -> EmbeddingResult<EmbeddingBatch> {
        let mut attempt = 1;
        loop {
            match self.inner.embed(request).await {
                Ok(batch) => return Ok(batch),
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let wait = self.policy.backoff();
                    tracing::warn!(
                        provider = self.inner.name(),
                        attempt,
                        ?wait,
                        error = %err,
                        "嵌入请求失败，等待后重试"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TransportError;
    use crate::client::mock::MockProvider;

    fn request() -> EmbeddingRequest {
        EmbeddingRequest::new(vec!["hello".to_string()]).unwrap()
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(5)).unwrap()
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mock = MockProvider::new(vec![vec![1.0, 0.0]]).failing_with(vec![
            TransportError::ConnectionRefused.into(),
            EmbeddingError::Provider { status: 503, message: "unavailable".into() },
        ]);
        let provider = Retrying::new(mock, fast_policy(3));

        let batch = provider.embed(&request()).await.unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(provider.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mock = MockProvider::new(vec![vec![1.0]]).failing_with(vec![
            TransportError::Timeout.into(),
            TransportError::Timeout.into(),
            TransportError::Timeout.into(),
        ]);
        let provider = Retrying::new(mock, fast_policy(2));

        let err = provider.embed(&request()).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(provider.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_authentication_errors_are_not_retried() {
        let mock = MockProvider::new(vec![vec![1.0]])
            .failing_with(vec![EmbeddingError::Authentication("HTTP 401".into())]);
        let provider = Retrying::new(mock, fast_policy(5));

        let err = provider.embed(&request()).await.unwrap_err();

        assert!(matches!(err, EmbeddingError::Authentication(_)));
        assert_eq!(provider.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_none_policy_calls_once() {
        let mock = MockProvider::new(vec![vec![1.0]])
            .failing_with(vec![TransportError::ConnectionRefused.into()]);
        let provider = Retrying::new(mock, RetryPolicy::none());

        assert!(provider.embed(&request()).await.is_err());
        assert_eq!(provider.inner().calls(), 1);
    }

    #[test]
    fn test_invalid_policies_are_rejected() {
        assert!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).is_err());
        assert!(RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_backoff_stays_in_range() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_millis(200)).unwrap();
        for _ in 0..50 {
            let wait = policy.backoff();
            assert!(wait >= Duration::from_millis(100) && wait <= Duration::from_millis(200));
        }
    }
}
