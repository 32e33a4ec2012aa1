pub mod benchmark;
pub mod client;
pub mod similarity;

pub use benchmark::{BenchmarkReport, BenchmarkRunner, TimingSample};
pub use client::{
    EmbeddingBatch, EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResult,
    ProviderConfig, TransportError, embed_with_timeout,
};
pub use similarity::{SimilarityEvaluator, SimilarityPair, cosine_similarity};
