//! Cascading administrative deletions.
//!
//! Every workflow re-reads the current remote state before mutating it, so
//! calling one against an index or namespace that is already gone is a
//! benign no-op rather than an error.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{VectorIndexError, VectorIndexResult, WrapContext};
use crate::lifecycle::IndexLifecycleManager;

pub struct AdministrativeCascadeDeleter {
    lifecycle: Arc<IndexLifecycleManager>,
}

impl AdministrativeCascadeDeleter {
    pub fn new(lifecycle: Arc<IndexLifecycleManager>) -> Self {
        Self { lifecycle }
    }

    /// Delete every vector in `namespace`, if both the index and namespace exist.
    ///
    /// Returns `false` without mutating anything when either is absent.
    /// Targets the probed host directly instead of going through the cache.
    #[instrument(skip(self))]
    pub async fn delete_all_vectors_in_namespace(
        &self,
        index_name: &str,
        namespace: &str,
    ) -> VectorIndexResult<bool> {
        let Some(descriptor) = self.lifecycle.check_exists(index_name).await? else {
            warn!("Index does not exist, skipping deletion");
            return Ok(false);
        };
        info!(host = %descriptor.host, "Index found, checking namespace");

        let context = || {
            format!(
                "delete_all_vectors_in_namespace(index={index_name}, namespace={namespace}): \
                 error during operation"
            )
        };

        let handle = self.lifecycle.handle_for(&descriptor).wrap_context(context)?;
        let stats = handle.describe_stats().await.wrap_context(context)?;

        let Some(ns_stats) = stats.namespace(namespace) else {
            info!("Namespace does not exist in index, no deletion performed");
            return Ok(false);
        };
        info!(record_count = ns_stats.record_count, "Namespace found, deleting all vectors");

        handle.delete_all(namespace).await.wrap_context(context)?;
        info!("All vectors in namespace deleted");
        Ok(true)
    }

    /// Unconditional delete; a missing index fails however the store reports it.
    ///
    /// The registry entry for `index_name` is evicted whenever the index is
    /// gone afterwards, including when the store reports it missing, so a
    /// later resolve re-probes instead of returning a dead handle.
    #[instrument(skip(self))]
    pub async fn delete_index(&self, index_name: &str) -> VectorIndexResult<()> {
        let result = self
            .lifecycle
            .store()
            .delete_index(index_name)
            .await
            .wrap_context(|| format!("delete_index(index={index_name}): error deleting index"));

        if matches!(&result, Err(err) if !is_missing_index(err)) {
            return result;
        }

        if self.lifecycle.registry().evict(index_name).await {
            info!("Evicted cached handle");
        }
        result?;
        info!("Index deleted");
        Ok(())
    }

    /// Delete every listed index in order, stopping at the first failure.
    /// Returns how many were deleted.
    #[instrument(skip(self))]
    pub async fn delete_all_indices(&self) -> VectorIndexResult<usize> {
        let context = || "delete_all_indices(): error deleting all indices".to_string();

        let indexes = self
            .lifecycle
            .store()
            .list_indexes()
            .await
            .wrap_context(context)?;

        if indexes.is_empty() {
            info!("No indices found to delete");
            return Ok(0);
        }

        let total = indexes.len();
        info!(total, "Found indices to delete");
        for descriptor in &indexes {
            self.delete_index(&descriptor.name)
                .await
                .wrap_context(context)?;
        }

        info!(total, "All indices deleted");
        Ok(total)
    }

    /// Delete `namespace` if index stats currently list it.
    ///
    /// Resolves through the cache, so a missing index is
    /// [`VectorIndexError::NotFound`]. Returns whether a delete was issued.
    #[instrument(skip(self))]
    pub async fn delete_namespace(
        &self,
        index_name: &str,
        namespace: &str,
    ) -> VectorIndexResult<bool> {
        let handle = self.lifecycle.resolve_handle(index_name).await?;

        let context = || {
            format!(
                "delete_namespace(index={index_name}, namespace={namespace}): \
                 error deleting namespace"
            )
        };

        let stats = handle.describe_stats().await.wrap_context(context)?;
        if stats.namespace(namespace).is_none() {
            info!("Namespace does not exist, no deletion performed");
            return Ok(false);
        }

        handle.delete_namespace(namespace).await.wrap_context(context)?;
        info!("Namespace deleted");
        Ok(true)
    }

    /// Delete each listed namespace in order, skipping blank names and
    /// stopping at the first failure. Returns how many were deleted.
    #[instrument(skip(self))]
    pub async fn delete_all_namespaces(&self, index_name: &str) -> VectorIndexResult<usize> {
        let handle = self.lifecycle.resolve_handle(index_name).await?;

        let context =
            || format!("delete_all_namespaces(index={index_name}): error deleting all namespaces");

        let namespaces = handle.list_namespaces().await.wrap_context(context)?;
        if namespaces.is_empty() {
            info!("No namespaces found to delete");
            return Ok(0);
        }
        info!(total = namespaces.len(), "Found namespaces to delete");

        let mut deleted = 0;
        for summary in &namespaces {
            let name = summary.name.trim();
            if name.is_empty() {
                continue;
            }
            if self
                .delete_namespace(index_name, name)
                .await
                .wrap_context(context)?
            {
                deleted += 1;
            }
        }

        info!(deleted, "All namespaces deleted");
        Ok(deleted)
    }
}

impl From<&Arc<IndexLifecycleManager>> for AdministrativeCascadeDeleter {
    fn from(lifecycle: &Arc<IndexLifecycleManager>) -> Self {
        Self::new(Arc::clone(lifecycle))
    }
}

/// Whether `err`, at any wrapping depth, means the index is already gone.
pub fn is_missing_index(err: &VectorIndexError) -> bool {
    match err.root_cause() {
        VectorIndexError::NotFound { .. } => true,
        VectorIndexError::Store(store) => store.is_not_found(),
        _ => false,
    }
}
