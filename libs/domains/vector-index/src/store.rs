use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    CreateIndexOptions, DeleteManyOptions, IndexDescriptor, IndexSpec, IndexStats,
    NamespaceSummary, QueryOptions, QueryResponse, VectorRecord,
};

/// Control-plane operations of the remote vector store.
///
/// `describe_index` must report a missing index as [`StoreError::NotFound`];
/// the lifecycle layer relies on that to tell "absent" apart from failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Probe a single index by name
    async fn describe_index(&self, name: &str) -> Result<IndexDescriptor, StoreError>;

    /// Create an index, optionally blocking until ready and ignoring conflicts
    async fn create_index(
        &self,
        spec: &IndexSpec,
        options: CreateIndexOptions,
    ) -> Result<(), StoreError>;

    /// List every index visible to the configured credentials
    async fn list_indexes(&self) -> Result<Vec<IndexDescriptor>, StoreError>;

    async fn delete_index(&self, name: &str) -> Result<(), StoreError>;

    /// Build a data-plane handle for an index at a known host (no network call)
    fn index(&self, name: &str, host: &str) -> Result<Arc<dyn IndexHandle>, StoreError>;
}

/// Data-plane operations on one index. Every call is namespace-scoped
/// except the index-wide stats and namespace listing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexHandle: Send + Sync {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>)
    -> Result<(), StoreError>;

    async fn query(
        &self,
        namespace: &str,
        options: QueryOptions,
    ) -> Result<QueryResponse, StoreError>;

    async fn delete_many(
        &self,
        namespace: &str,
        options: DeleteManyOptions,
    ) -> Result<(), StoreError>;

    async fn delete_all(&self, namespace: &str) -> Result<(), StoreError>;

    async fn describe_stats(&self) -> Result<IndexStats, StoreError>;

    async fn list_namespaces(&self) -> Result<Vec<NamespaceSummary>, StoreError>;

    async fn delete_namespace(&self, namespace: &str) -> Result<(), StoreError>;
}
