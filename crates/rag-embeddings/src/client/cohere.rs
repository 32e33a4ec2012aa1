use std::fmt;
use std::str::FromStr;
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

const COHERE_BASE_URL: &str = "https://api.cohere.ai";
const DEFAULT_MODEL: &str = "embed-multilingual-v3.0";
const MAX_BATCH_SIZE: usize = 90;

const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("embed-english-v2.0", 4096),
    ("embed-english-light-v2.0", 1024),
    ("embed-multilingual-v2.0", 768),
    ("embed-english-v3.0", 1024),
    ("embed-english-light-v3.0", 384),
    ("embed-multilingual-v3.0", 1024),
    ("embed-multilingual-light-v3.0", 384),
];

/// v3 及以后的模型必须指定 input_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    SearchDocument,
    SearchQuery,
    Classification,
    Clustering,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchDocument => "search_document",
            Self::SearchQuery => "search_query",
            Self::Classification => "classification",
            Self::Clustering => "clustering",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search_document" => Ok(Self::SearchDocument),
            "search_query" => Ok(Self::SearchQuery),
            "classification" => Ok(Self::Classification),
            "clustering" => Ok(Self::Clustering),
            other => Err(EmbeddingError::config(format!("unknown input_type: {}", other))),
        }
    }
}

#[derive(Serialize)]
struct CohereRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    truncate: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_type: Option<InputType>,
}

#[derive(Deserialize, Debug)]
struct CohereResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|err| err.message)
}

fn is_v3(model: &str) -> bool {
    model.ends_with("v3.0")
}

/// Cohere `/v1/embed` 客户端
pub struct CohereEmbeddingClient {
    api_key: String,
    model: String,
    input_type: Option<InputType>,
    base_url: String,
    timeout: Option<Duration>,
    max_batch_size: usize,
    client: Client,
    dimension: usize,
}

impl CohereEmbeddingClient {
    pub fn new(
        client: Client,
        config: ProviderConfig,
        input_type: Option<InputType>,
    ) -> EmbeddingResult<Self> {
        let model = config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let dimension = EMBEDDING_MODELS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, dims)| *dims)
            .ok_or_else(|| {
                let supported: Vec<&str> = EMBEDDING_MODELS.iter().map(|(name, _)| *name).collect();
                EmbeddingError::config(format!(
                    "'model' should be one of {:?}; got {}",
                    supported, model
                ))
            })?;

        if is_v3(&model) && input_type.is_none() {
            return Err(EmbeddingError::config(
                "'input_type' is required from v3 onwards; should be one of \
                 search_document, search_query, classification, clustering",
            ));
        }

        Ok(Self {
            base_url: config.base_url_or(COHERE_BASE_URL),
            max_batch_size: config.batch_size_or(MAX_BATCH_SIZE)?,
            timeout: config.timeout,
            api_key: config.credential,
            model,
            input_type,
            client,
            dimension,
        })
    }

    pub fn for_documents(client: Client, config: ProviderConfig) -> EmbeddingResult<Self> {
        Self::new(client, config, Some(InputType::SearchDocument))
    }

    pub fn for_queries(client: Client, config: ProviderConfig) -> EmbeddingResult<Self> {
        Self::new(client, config, Some(InputType::SearchQuery))
    }

    pub fn input_type(&self) -> Option<InputType> {
        self.input_type
    }

    fn embed_url(&self) -> String {
        format!("{}/v1/embed", self.base_url)
    }

    async fn embed_partition(
        &self,
        model: &str,
        credential: &str,
        partition: &[String],
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        let request = CohereRequest {
            texts: partition,
            model,
            truncate: "END",
            input_type: self.input_type,
        };
        let resp: CohereResponse = post_json(
            &self.client,
            &self.embed_url(),
            credential,
            &request,
            self.timeout,
            error_message,
        )
        .await?;

        if resp.embeddings.len() != partition.len() {
            return Err(EmbeddingError::Decode(format!(
                "expected {} embeddings, got {}",
                partition.len(),
                resp.embeddings.len()
            )));
        }
        Ok(resp.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for CohereEmbeddingClient {
    async fn embed(&self, request: &EmbeddingRequest) -> EmbeddingResult<EmbeddingBatch> {
        let model = request.model().unwrap_or(&self.model);
        let credential = request.credential().unwrap_or(&self.api_key);

        let partitions = request.inputs().chunks(self.max_batch_size);
        tracing::debug!(
            model,
            inputs = request.len(),
            partitions = partitions.len(),
            input_type = ?self.input_type,
            "发送 Cohere 嵌入请求"
        );

        let results = try_join_all(
            partitions.map(|partition| self.embed_partition(model, credential, partition)),
        )
        .await?;

        EmbeddingBatch::aligned(model, request.len(), results.into_iter().flatten().collect())
    }

    fn name(&self) -> &str {
        "cohere"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}
