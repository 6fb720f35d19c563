use std::sync::Arc;

use crate::admin::AdministrativeCascadeDeleter;
use crate::data_plane::VectorDataPlane;
use crate::embedding::EmbeddingProvider;
use crate::error::{VectorIndexError, VectorIndexResult};
use crate::lifecycle::IndexLifecycleManager;
use crate::metadata::{DefaultMetadataSanitizer, MetadataSanitizer};
use crate::models::EmbedOptions;
use crate::pipeline::IndexingPipeline;
use crate::store::VectorStore;

/// Wires the lifecycle manager, data plane, cascade deleter and (when an
/// embedding provider is configured) the indexing pipeline around one store
/// and one shared handle registry.
pub struct VectorIndexService {
    lifecycle: Arc<IndexLifecycleManager>,
    data_plane: Arc<VectorDataPlane>,
    admin: AdministrativeCascadeDeleter,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    sanitizer: Arc<dyn MetadataSanitizer>,
}

impl VectorIndexService {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        let lifecycle = Arc::new(IndexLifecycleManager::new(store));
        Self {
            data_plane: Arc::new(VectorDataPlane::new(Arc::clone(&lifecycle))),
            admin: AdministrativeCascadeDeleter::new(Arc::clone(&lifecycle)),
            lifecycle,
            embedding_provider: None,
            sanitizer: Arc::new(DefaultMetadataSanitizer),
        }
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn MetadataSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn lifecycle(&self) -> &IndexLifecycleManager {
        &self.lifecycle
    }

    pub fn data_plane(&self) -> &VectorDataPlane {
        &self.data_plane
    }

    pub fn admin(&self) -> &AdministrativeCascadeDeleter {
        &self.admin
    }

    fn embedder(&self) -> VectorIndexResult<&Arc<dyn EmbeddingProvider>> {
        self.embedding_provider
            .as_ref()
            .ok_or_else(|| VectorIndexError::Config("No embedding provider configured".to_string()))
    }

    pub fn pipeline(&self) -> VectorIndexResult<IndexingPipeline> {
        Ok(IndexingPipeline::new(
            Arc::clone(self.embedder()?),
            Arc::clone(&self.sanitizer),
            Arc::clone(&self.data_plane),
        ))
    }

    /// Embed free text as a retrieval query
    pub async fn embed_query(&self, text: &str) -> VectorIndexResult<Vec<f32>> {
        self.embedder()?
            .embed(&[text.to_string()], &EmbedOptions::retrieval_query())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VectorIndexError::Embedding("No embedding returned".to_string()))
    }
}
