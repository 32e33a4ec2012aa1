use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::client::http::post_json;
use crate::client::{
    EmbeddingBatch, EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResult,
    ProviderConfig,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "text-embedding-ada-002";
/// 单次请求的最大输入条数，超过则拆分
const MAX_BATCH_SIZE: usize = 150;

/// 支持的模型及其向量维度
const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("text-embedding-ada-002", 1536),
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-similarity-ada-001", 1024),
    ("text-similarity-babbage-001", 2048),
    ("text-similarity-curie-001", 4096),
    ("text-similarity-davinci-001", 12288),
    ("text-search-ada-doc-001", 1024),
    ("text-search-ada-query-001", 1024),
    ("text-search-babbage-doc-001", 2048),
    ("text-search-babbage-query-001", 2048),
    ("text-search-curie-doc-001", 4096),
    ("text-search-curie-query-001", 4096),
    ("text-search-davinci-doc-001", 12288),
    ("text-search-davinci-query-001", 12288),
    ("code-search-ada-code-001", 1024),
    ("code-search-ada-text-001", 1024),
    ("code-search-babbage-code-001", 2048),
    ("code-search-babbage-text-001", 2048),
];

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingItem>,
}

#[derive(Deserialize, Debug)]
struct OpenAiEmbeddingItem {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Deserialize, Debug)]
struct OpenAiError {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    error: OpenAiError,
}

fn error_message(body: &str) -> Option<String> {
    let err_resp = serde_json::from_str::<ErrorResponse>(body).ok()?;
    let msg = err_resp.error.message.unwrap_or_else(|| "Unknown error".to_string());
    Some(match err_resp.error.code {
        Some(code) => format!("[{}] {}", code, msg),
        None => msg,
    })
}

pub fn model_dimension(model: &str) -> Option<usize> {
    EMBEDDING_MODELS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, dims)| *dims)
}

/// OpenAI `/v1/embeddings` 客户端
pub struct OpenAiEmbeddingClient {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Option<Duration>,
    max_batch_size: usize,
    client: Client,
    dimension: usize,
}

impl OpenAiEmbeddingClient {
    pub fn new(client: Client, config: ProviderConfig) -> EmbeddingResult<Self> {
        let model = config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let dimension = model_dimension(&model).ok_or_else(|| {
            let supported: Vec<&str> = EMBEDDING_MODELS.iter().map(|(name, _)| *name).collect();
            EmbeddingError::config(format!(
                "'model' should be one of {:?}; got {}",
                supported, model
            ))
        })?;

        Ok(Self {
            base_url: config.base_url_or(OPENAI_BASE_URL),
            max_batch_size: config.batch_size_or(MAX_BATCH_SIZE)?,
            timeout: config.timeout,
            api_key: config.credential,
            model,
            client,
            dimension,
        })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    async fn embed_partition(
        &self,
        model: &str,
        credential: &str,
        partition: &[String],
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        let request = OpenAiRequest {
            model,
            input: partition,
        };
        let resp: OpenAiEmbeddingResponse = post_json(
            &self.client,
            &self.embeddings_url(),
            credential,
            &request,
            self.timeout,
            error_message,
        )
        .await?;

        let mut embeddings = resp.data;
        embeddings.sort_by_key(|item| item.index);
        if embeddings.len() != partition.len()
            || embeddings.iter().enumerate().any(|(pos, item)| item.index != pos)
        {
            return Err(EmbeddingError::Decode(format!(
                "response indices do not cover {} inputs",
                partition.len()
            )));
        }

        Ok(embeddings.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    async fn embed(&self, request: &EmbeddingRequest) -> EmbeddingResult<EmbeddingBatch> {
        let model = request.model().unwrap_or(&self.model);
        let credential = request.credential().unwrap_or(&self.api_key);

        let partitions = request.inputs().chunks(self.max_batch_size);
        tracing::debug!(
            model,
            inputs = request.len(),
            partitions = partitions.len(),
            "发送 OpenAI 嵌入请求"
        );

        let results = try_join_all(
            partitions.map(|partition| self.embed_partition(model, credential, partition)),
        )
        .await?;

        EmbeddingBatch::aligned(model, request.len(), results.into_iter().flatten().collect())
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}
