use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use rag_embeddings::client::cohere::CohereEmbeddingClient;
use rag_embeddings::client::openai::OpenAiEmbeddingClient;
use rag_embeddings::client::Retrying;
use rag_embeddings::{
    BenchmarkRunner, EmbeddingProvider, EmbeddingRequest, EmbeddingResult, SimilarityEvaluator,
    SimilarityPair, TimingSample,
};
use reqwest::Client;
use serde::Serialize;

use crate::settings::Settings;

/// 结果输出格式：终端文本或每个服务商一段 JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{}', expected text or json", other)),
        }
    }
}

/// 单个服务商的延迟统计与相似度表
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub provider: String,
    pub model: String,
    pub dimension: Option<usize>,
    pub mean_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
    pub samples: Vec<TimingSample>,
    pub pairs: Vec<SimilarityPair>,
}

/// 为每个配置了 API key 的服务商构建客户端，共用同一个连接池
pub fn build_providers(settings: &Settings, session: &Client) -> Result<Vec<Box<dyn EmbeddingProvider>>> {
    let mut providers: Vec<Box<dyn EmbeddingProvider>> = Vec::new();

    if let Some(config) = &settings.openai {
        let client = OpenAiEmbeddingClient::new(session.clone(), config.clone())
            .map_err(|e| anyhow!("openai: {}", e))?;
        providers.push(Box::new(Retrying::new(client, settings.retry)));
    }
    if let Some(config) = &settings.cohere {
        let client = CohereEmbeddingClient::new(
            session.clone(),
            config.clone(),
            Some(settings.cohere_input_type),
        )
        .map_err(|e| anyhow!("cohere: {}", e))?;
        providers.push(Box::new(Retrying::new(client, settings.retry)));
    }

    Ok(providers)
}

/// 对一个服务商做基准测试，再用最后一次返回的向量计算两两相似度
pub async fn compare_provider<P>(
    provider: &P,
    texts: &[String],
    runs: usize,
) -> EmbeddingResult<ProviderSummary>
where
    P: EmbeddingProvider + ?Sized,
{
    let runner = BenchmarkRunner::new(runs)?;
    let request = EmbeddingRequest::new(texts.to_vec())?;

    let report = runner.run(provider, &request).await?;
    let evaluator = SimilarityEvaluator::from_batch(texts, report.last_batch())?;

    Ok(ProviderSummary {
        provider: report.provider().to_string(),
        model: report.last_batch().model().to_string(),
        dimension: report.last_batch().dimension(),
        mean_secs: report.mean().as_secs_f64(),
        min_secs: report.min().as_secs_f64(),
        max_secs: report.max().as_secs_f64(),
        samples: report.samples().to_vec(),
        pairs: evaluator.pairs()?,
    })
}

pub fn render_as(summary: &ProviderSummary, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render(summary)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

pub fn render(summary: &ProviderSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "📊 {} ({}, dim={})",
        summary.provider,
        summary.model,
        summary.dimension.map_or_else(|| "?".to_string(), |d| d.to_string())
    );
    let _ = writeln!(
        out,
        "   runs={} mean={:.3}s min={:.3}s max={:.3}s",
        summary.samples.len(),
        summary.mean_secs,
        summary.min_secs,
        summary.max_secs
    );
    for pair in &summary.pairs {
        let _ = writeln!(out, "   {:>8.4}  {} <-> {}", pair.score, pair.a, pair.b);
    }
    out
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rag_embeddings::{EmbeddingBatch, EmbeddingError};

    use super::*;

    struct FixedProvider;

    #[async_trait]
    impl EmbeddingProvider for FixedProvider {
        async fn embed(&self, request: &EmbeddingRequest) -> EmbeddingResult<EmbeddingBatch> {
            let vectors = request
                .inputs()
                .iter()
                .map(|text| match text.as_str() {
                    "cat" => vec![1.0, 0.0],
                    "dog" => vec![0.9, 0.1],
                    _ => vec![0.0, 1.0],
                })
                .collect();
            EmbeddingBatch::aligned("fixed-v1", request.len(), vectors)
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-v1"
        }

        fn dimension(&self) -> Option<usize> {
            Some(2)
        }
    }

    fn texts() -> Vec<String> {
        ["cat", "dog", "airplane"].iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_compare_provider_ranks_related_pair_first() {
        let summary = compare_provider(&FixedProvider, &texts(), 3).await.unwrap();

        assert_eq!(summary.provider, "fixed");
        assert_eq!(summary.samples.len(), 3);
        assert_eq!(summary.dimension, Some(2));
        assert_eq!((summary.pairs[0].a.as_str(), summary.pairs[0].b.as_str()), ("cat", "dog"));

        let rendered = render(&summary);
        assert!(rendered.contains("fixed (fixed-v1, dim=2)"));
        assert!(rendered.contains("cat <-> dog"));
    }

    #[tokio::test]
    async fn test_json_output_carries_stats_and_pairs() {
        let summary = compare_provider(&FixedProvider, &texts(), 2).await.unwrap();

        let rendered = render_as(&summary, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["provider"], "fixed");
        assert_eq!(value["dimension"], 2);
        assert_eq!(value["samples"].as_array().unwrap().len(), 2);
        assert_eq!(value["pairs"][0]["a"], "cat");
        assert_eq!(value["pairs"][0]["b"], "dog");
        assert_eq!(render_as(&summary, OutputFormat::Text).unwrap(), render(&summary));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[tokio::test]
    async fn test_zero_runs_is_rejected() {
        let err = compare_provider(&FixedProvider, &texts(), 0).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_duplicate_texts_are_rejected() {
        let texts = vec!["cat".to_string(), "cat".to_string()];
        let err = compare_provider(&FixedProvider, &texts, 1).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Configuration(_)));
    }

    #[test]
    fn test_build_providers_skips_missing_keys() {
        let settings = Settings::from_lookup(|key| match key {
            "COHERE_API_KEY" => Some("co-test".to_string()),
            _ => None,
        })
        .unwrap();

        let providers = build_providers(&settings, &Client::new()).unwrap();

        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name(), "cohere");
        assert_eq!(providers[0].model(), "embed-multilingual-v3.0");
    }

    #[test]
    fn test_build_providers_reports_bad_model() {
        let settings = Settings::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "OPENAI_EMBED_MODEL" => Some("not-a-model".to_string()),
            _ => None,
        })
        .unwrap();

        let err = build_providers(&settings, &Client::new()).err().unwrap();
        assert!(err.to_string().starts_with("openai:"));
    }
}
