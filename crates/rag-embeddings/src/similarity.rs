use std::collections::HashMap;

use serde::Serialize;

use crate::client::{EmbeddingBatch, EmbeddingError, EmbeddingResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityPair {
    pub a: String,
    pub b: String,
    pub score: f32,
}

/// 余弦相似度 dot(a,b) / (‖a‖·‖b‖)，结果限制在 [-1, 1]
///
/// 维度不一致、空向量、零向量或包含 NaN/inf 时返回 Domain 错误，`label` 用于指明出错的输入。
pub fn cosine_similarity(a: &[f32], b: &[f32], label: &str) -> EmbeddingResult<f32> {
    if a.is_empty() || b.is_empty() {
        return Err(EmbeddingError::domain(label, "embedding vector is empty"));
    }
    if a.len() != b.len() {
        return Err(EmbeddingError::domain(
            label,
            format!("embedding dimension mismatch: {} vs {}", a.len(), b.len()),
        ));
    }
    if a.iter().chain(b).any(|x| !x.is_finite()) {
        return Err(EmbeddingError::domain(label, "embedding contains a non-finite value"));
    }

    // 用 f64 累加，减少高维向量的舍入误差
    let mut dot = 0.0f64;
    let mut a_norm = 0.0f64;
    let mut b_norm = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        a_norm += x * x;
        b_norm += y * y;
    }

    let denom = a_norm.sqrt() * b_norm.sqrt();
    if denom == 0.0 {
        return Err(EmbeddingError::domain(
            label,
            "cannot compute cosine similarity with zero vector",
        ));
    }

    Ok((dot / denom).clamp(-1.0, 1.0) as f32)
}

/// 按标签比较一小组向量的语义距离
#[derive(Debug, Clone, Default)]
pub struct SimilarityEvaluator {
    labels: Vec<String>,
    vectors: HashMap<String, Vec<f32>>,
}

impl SimilarityEvaluator {
    /// 标签必须唯一
    pub fn new<I, L>(entries: I) -> EmbeddingResult<Self>
    where
        I: IntoIterator<Item = (L, Vec<f32>)>,
        L: Into<String>,
    {
        let mut evaluator = Self::default();
        for (label, vector) in entries {
            let label = label.into();
            if evaluator.vectors.contains_key(&label) {
                return Err(EmbeddingError::config(format!("duplicate label: {}", label)));
            }
            evaluator.labels.push(label.clone());
            evaluator.vectors.insert(label, vector);
        }
        Ok(evaluator)
    }

    /// 按位置把原始输入与返回的向量配对
    pub fn from_batch(inputs: &[String], batch: &EmbeddingBatch) -> EmbeddingResult<Self> {
        if inputs.len() != batch.len() {
            return Err(EmbeddingError::config(format!(
                "{} inputs but {} embeddings",
                inputs.len(),
                batch.len()
            )));
        }
        Self::new(inputs.iter().cloned().zip(batch.vectors().iter().cloned()))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn get(&self, label: &str) -> Option<&[f32]> {
        self.vectors.get(label).map(Vec::as_slice)
    }

    pub fn similarity(&self, a_label: &str, b_label: &str) -> EmbeddingResult<f32> {
        let a = self.lookup(a_label)?;
        let b = self.lookup(b_label)?;
        let label = if a.is_empty() || !has_norm(a) { a_label } else { b_label };
        cosine_similarity(a, b, label)
    }

    /// 所有无序标签对，按相似度从高到低排列
    pub fn pairs(&self) -> EmbeddingResult<Vec<SimilarityPair>> {
        let mut pairs = Vec::new();
        for (i, a) in self.labels.iter().enumerate() {
            for b in &self.labels[i + 1..] {
                pairs.push(SimilarityPair {
                    a: a.clone(),
                    b: b.clone(),
                    score: self.similarity(a, b)?,
                });
            }
        }
        pairs.sort_by(|x, y| y.score.total_cmp(&x.score));
        Ok(pairs)
    }

    fn lookup(&self, label: &str) -> EmbeddingResult<&[f32]> {
        self.get(label)
            .ok_or_else(|| EmbeddingError::domain(label, "unknown label"))
    }
}

fn has_norm(v: &[f32]) -> bool {
    v.iter().any(|x| *x != 0.0)
}
