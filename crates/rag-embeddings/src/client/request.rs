use serde::{Deserialize, Serialize};

use crate::client::{EmbeddingError, EmbeddingResult};

/// 一次嵌入请求：至少一条输入，可覆盖模型与凭证
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingRequest {
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing)]
    credential: Option<String>,
}

impl EmbeddingRequest {
    pub fn new(inputs: Vec<String>) -> EmbeddingResult<Self> {
        if inputs.is_empty() {
            return Err(EmbeddingError::config("Input texts cannot be empty"));
        }
        Ok(Self {
            inputs,
            model: None,
            credential: None,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

/// 与请求输入按位置对齐的一批向量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingBatch {
    model: String,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingBatch {
    /// 校验返回向量数量与输入数量一致
    pub fn aligned(
        model: impl Into<String>,
        expected: usize,
        vectors: Vec<Vec<f32>>,
    ) -> EmbeddingResult<Self> {
        if vectors.len() != expected {
            return Err(EmbeddingError::Decode(format!(
                "expected {} embeddings, got {}",
                expected,
                vectors.len()
            )));
        }
        Ok(Self {
            model: model.into(),
            vectors,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_is_rejected() {
        let result = EmbeddingRequest::new(vec![]);
        assert!(matches!(result, Err(EmbeddingError::Configuration(_))));
    }

    #[test]
    fn empty_strings_are_valid_inputs() {
        let request = EmbeddingRequest::new(vec![String::new()]).unwrap();
        assert_eq!(request.len(), 1);
    }

    #[test]
    fn credential_is_never_serialized() {
        let request = EmbeddingRequest::new(vec!["a".into()])
            .unwrap()
            .with_model("m")
            .with_credential("secret");
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"model\":\"m\""));
    }

    #[test]
    fn misaligned_batch_is_a_decode_error() {
        let result = EmbeddingBatch::aligned("m", 3, vec![vec![1.0], vec![2.0]]);
        assert!(matches!(result, Err(EmbeddingError::Decode(_))));
    }
}
