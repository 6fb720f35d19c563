use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use crate::batch::{BatchSplitter, DEFAULT_BATCH_SIZE};
use crate::error::{VectorIndexError, VectorIndexResult, WrapContext};
use crate::lifecycle::IndexLifecycleManager;
use crate::models::{DeleteManyOptions, IndexStats, QueryOptions, QueryResponse, VectorRecord};

/// Outcome of a batched upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub batches: usize,
    pub records: usize,
}

/// Namespace-scoped upsert, query, delete and stats on top of cached handles
pub struct VectorDataPlane {
    lifecycle: Arc<IndexLifecycleManager>,
}

impl VectorDataPlane {
    pub fn new(lifecycle: Arc<IndexLifecycleManager>) -> Self {
        Self { lifecycle }
    }

    pub fn lifecycle(&self) -> &Arc<IndexLifecycleManager> {
        &self.lifecycle
    }

    /// [`upsert_batched`](Self::upsert_batched) with the default batch size
    pub async fn upsert(
        &self,
        index_name: &str,
        records: Vec<VectorRecord>,
        namespace: &str,
    ) -> VectorIndexResult<UpsertSummary> {
        self.upsert_batched(index_name, records, namespace, DEFAULT_BATCH_SIZE)
            .await
    }

    /// Split `records` into batches and upsert them one after another.
    ///
    /// The first failing batch aborts the rest; batches already written stay
    /// written.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn upsert_batched(
        &self,
        index_name: &str,
        records: Vec<VectorRecord>,
        namespace: &str,
        batch_size: usize,
    ) -> VectorIndexResult<UpsertSummary> {
        if records.is_empty() {
            return Err(VectorIndexError::Validation(
                "upsert requires at least one record".to_string(),
            ));
        }
        let splitter = BatchSplitter::new(batch_size)?;
        let handle = self.lifecycle.resolve_handle(index_name).await?;

        let total_records = records.len();
        let total = splitter.total_batches(total_records);

        for (i, batch) in splitter.split_owned(records).into_iter().enumerate() {
            let current = i + 1;
            let size = batch.len();
            info!(batch = current, total, size, "Upserting batch");

            handle.upsert(namespace, batch).await.wrap_context(|| {
                format!(
                    "upsert_batched(index={index_name}, namespace={namespace}): \
                     batch {current}/{total} failed"
                )
            })?;
        }

        info!(batches = total, "All batches upserted");
        Ok(UpsertSummary {
            batches: total,
            records: total_records,
        })
    }

    /// Single similarity query, no batching
    #[instrument(skip(self, options), fields(k = options.top_k))]
    pub async fn query(
        &self,
        index_name: &str,
        options: QueryOptions,
        namespace: &str,
    ) -> VectorIndexResult<QueryResponse> {
        options.validate()?;
        let handle = self.lifecycle.resolve_handle(index_name).await?;

        let k = options.top_k;
        let response = handle.query(namespace, options).await.wrap_context(|| {
            format!("query(index={index_name}, namespace={namespace}, k={k}): error querying vectors")
        })?;

        info!(matches = response.matches.len(), "Query successful");
        Ok(response)
    }

    /// Bulk delete by id list or metadata filter
    #[instrument(skip(self, options))]
    pub async fn delete_many(
        &self,
        index_name: &str,
        options: DeleteManyOptions,
        namespace: &str,
    ) -> VectorIndexResult<()> {
        options.validate()?;
        let handle = self.lifecycle.resolve_handle(index_name).await?;

        handle.delete_many(namespace, options).await.wrap_context(|| {
            format!("delete_many(index={index_name}, namespace={namespace}): error deleting vectors")
        })?;

        info!("Vectors deleted");
        Ok(())
    }

    /// Index-wide statistics, always fetched fresh
    #[instrument(skip(self))]
    pub async fn stats(&self, index_name: &str) -> VectorIndexResult<IndexStats> {
        let handle = self.lifecycle.resolve_handle(index_name).await?;

        let stats = handle.describe_stats().await.wrap_context(|| {
            format!("stats(index={index_name}): error describing index stats")
        })?;

        info!(
            dimension = stats.dimension,
            total_records = stats.total_record_count,
            namespaces = stats.namespaces.len(),
            "Index stats fetched"
        );
        Ok(stats)
    }
}
