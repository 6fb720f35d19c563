use async_trait::async_trait;

use crate::error::{VectorIndexError, VectorIndexResult};
use crate::models::{EmbedOptions, EmbeddingModel, EmbeddingProviderType};

/// Text-to-vector collaborator.
///
/// `embed` returns exactly one vector per input text, in input order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> EmbeddingProviderType;

    /// Model every call is made against
    fn model(&self) -> EmbeddingModel;

    async fn embed(
        &self,
        texts: &[String],
        options: &EmbedOptions,
    ) -> VectorIndexResult<Vec<Vec<f32>>>;
}

pub(crate) fn ensure_one_per_text(
    provider: EmbeddingProviderType,
    expected: usize,
    vectors: Vec<Vec<f32>>,
) -> VectorIndexResult<Vec<Vec<f32>>> {
    if vectors.len() != expected {
        return Err(VectorIndexError::Embedding(format!(
            "{provider} returned {} embeddings for {expected} texts",
            vectors.len()
        )));
    }
    Ok(vectors)
}
