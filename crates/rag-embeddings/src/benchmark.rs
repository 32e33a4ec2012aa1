use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::client::{EmbeddingBatch, EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResult};

/// 单次调用耗时
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSample {
    pub provider: String,
    pub run: usize,
    pub elapsed: Duration,
}

impl TimingSample {
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    provider: String,
    samples: Vec<TimingSample>,
    last_batch: EmbeddingBatch,
}

impl BenchmarkReport {
    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn samples(&self) -> &[TimingSample] {
        &self.samples
    }

    /// 最后一次调用返回的向量，供相似度评估使用
    pub fn last_batch(&self) -> &EmbeddingBatch {
        &self.last_batch
    }

    pub fn into_last_batch(self) -> EmbeddingBatch {
        self.last_batch
    }

    pub fn mean(&self) -> Duration {
        let total: Duration = self.samples.iter().map(|s| s.elapsed).sum();
        // samples 非空由 BenchmarkRunner 保证
        total / self.samples.len() as u32
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().map(|s| s.elapsed).min().unwrap_or_default()
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().map(|s| s.elapsed).max().unwrap_or_default()
    }
}

/// 顺序重复调用同一请求并记录每次耗时
///
/// 刻意不并发：并发会把网络争用混入单次延迟。
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkRunner {
    runs: usize,
}

impl BenchmarkRunner {
    pub fn new(runs: usize) -> EmbeddingResult<Self> {
        if runs == 0 {
            return Err(EmbeddingError::config("run count must be a positive integer"));
        }
        if u32::try_from(runs).is_err() {
            return Err(EmbeddingError::config(format!("run count {} is too large", runs)));
        }
        Ok(Self { runs })
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    /// 任意一次失败立即返回该错误，不计算部分平均值
    pub async fn run<P>(&self, provider: &P, request: &EmbeddingRequest) -> EmbeddingResult<BenchmarkReport>
    where
        P: EmbeddingProvider + ?Sized,
    {
        let mut samples = Vec::with_capacity(self.runs);
        let mut last_batch = None;

        for run in 0..self.runs {
            let start = Instant::now();
            let batch = provider.embed(request).await?;
            let elapsed = start.elapsed();

            debug!(provider = provider.name(), run, ?elapsed, vectors = batch.len(), "完成一次嵌入调用");
            samples.push(TimingSample {
                provider: provider.name().to_string(),
                run,
                elapsed,
            });
            last_batch = Some(batch);
        }

        let Some(last_batch) = last_batch else {
            return Err(EmbeddingError::config("run count must be a positive integer"));
        };
        let report = BenchmarkReport {
            provider: provider.name().to_string(),
            samples,
            last_batch,
        };
        info!(
            provider = report.provider(),
            runs = self.runs,
            mean = ?report.mean(),
            "基准测试完成"
        );
        Ok(report)
    }
}
