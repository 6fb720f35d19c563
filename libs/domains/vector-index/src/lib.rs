//! Vector Index Domain Library
//!
//! Client-side orchestration in front of a hosted vector-index store:
//! cached index handles, create-or-get provisioning, batched upserts,
//! a fail-fast indexing pipeline and cascading administrative deletes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌────────────────────────────┐
//! │ IndexingPipeline │   │ AdministrativeCascadeDeleter│
//! └────────┬─────────┘   └──────────────┬─────────────┘
//!          │                            │
//! ┌────────▼─────────┐                  │
//! │ VectorDataPlane  │                  │
//! └────────┬─────────┘                  │
//!          │                            │
//! ┌────────▼────────────────────────────▼┐     ┌───────────────┐
//! │        IndexLifecycleManager         │────►│ IndexRegistry │
//! └────────────────┬─────────────────────┘     └───────────────┘
//!                  │
//! ┌────────────────▼────────┐     ┌──────────────────┐
//! │ VectorStore/IndexHandle │     │ EmbeddingProvider │
//! │        (traits)         │     │     (trait)       │
//! └────────────────┬────────┘     └────────┬─────────┘
//!                  │                       │
//! ┌────────────────▼────────┐     ┌────────▼─────────┐
//! │ PineconeClient          │     │ VertexAIProvider │
//! │ PineconeIndex           │     │ OpenAIProvider   │
//! └─────────────────────────┘     └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use core_config::FromEnv;
//! use domain_vector_index::{
//!     Document, IndexSpec, PineconeClient, PineconeConfig, VectorIndexService, VertexAIProvider,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PineconeClient::new(PineconeConfig::from_env()?)?;
//! let service = VectorIndexService::new(Arc::new(store))
//!     .with_embedding_provider(Arc::new(VertexAIProvider::from_env()?));
//!
//! service.lifecycle().get_or_create(&IndexSpec::new("kb", 768)).await?;
//!
//! let docs = vec![Document {
//!     id: "refunds".to_string(),
//!     title: "Refunds".to_string(),
//!     content: "Refunds are issued within 30 days.".to_string(),
//!     metadata: serde_json::json!({"team": "billing"}),
//! }];
//! service.pipeline()?.run_indexing(&docs, "kb", "policies", 100).await?;
//!
//! service.admin().delete_all_vectors_in_namespace("kb", "policies").await?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod batch;
pub mod data_plane;
pub mod embedding;
pub mod error;
pub mod lifecycle;
pub mod metadata;
pub mod models;
pub mod pinecone;
pub mod pipeline;
pub mod registry;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use admin::AdministrativeCascadeDeleter;
pub use batch::{BatchSplitter, DEFAULT_BATCH_SIZE};
pub use data_plane::{UpsertSummary, VectorDataPlane};
pub use embedding::{
    EmbeddingProvider, OpenAIConfig, OpenAIProvider, VertexAIConfig, VertexAIProvider,
};
pub use error::{StoreError, VectorIndexError, VectorIndexResult};
pub use lifecycle::IndexLifecycleManager;
pub use metadata::{DefaultMetadataSanitizer, MetadataSanitizer};
pub use models::{
    Cloud, CreateIndexOptions, DeleteManyOptions, DistanceMetric, Document, EmbedOptions,
    EmbeddingModel, EmbeddingProviderType, IndexDeployment, IndexDescriptor, IndexSpec,
    IndexStats, Metadata, MetadataValue, NamespaceStats, NamespaceSummary, QueryMatch,
    QueryOptions, QueryResponse, TaskType, VectorRecord,
};
pub use pinecone::{PineconeClient, PineconeConfig, PineconeIndex};
pub use pipeline::{Indexable, IndexingPipeline, PipelineConfig};
pub use registry::IndexRegistry;
pub use service::VectorIndexService;
pub use store::{IndexHandle, VectorStore};
