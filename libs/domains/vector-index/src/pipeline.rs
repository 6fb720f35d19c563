//! Batch indexing: domain records in, embedded and sanitized vectors out.

use std::sync::Arc;

use core_config::{ConfigError, FromEnv, env_parse_or};
use futures::future::try_join_all;
use tracing::{info, instrument};

use crate::batch::{BatchSplitter, DEFAULT_BATCH_SIZE};
use crate::data_plane::{UpsertSummary, VectorDataPlane};
use crate::embedding::EmbeddingProvider;
use crate::error::{VectorIndexError, VectorIndexResult, WrapContext};
use crate::metadata::MetadataSanitizer;
use crate::models::{Document, EmbedOptions, VectorRecord};

/// A domain record that can be turned into one vector.
pub trait Indexable: Send + Sync {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn content(&self) -> &str;
    fn metadata(&self) -> &serde_json::Value;

    /// Text handed to the embedding provider
    fn embedding_text(&self) -> String {
        format!("{}\n{}", self.title(), self.content())
    }
}

impl Indexable for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl FromEnv for PipelineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let batch_size = env_parse_or("VECTOR_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(ConfigError::ParseError {
                key: "VECTOR_BATCH_SIZE".to_string(),
                details: "must be at least 1".to_string(),
            });
        }
        Ok(Self { batch_size })
    }
}

pub struct IndexingPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    sanitizer: Arc<dyn MetadataSanitizer>,
    data_plane: Arc<VectorDataPlane>,
}

impl IndexingPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        sanitizer: Arc<dyn MetadataSanitizer>,
        data_plane: Arc<VectorDataPlane>,
    ) -> Self {
        Self {
            embedder,
            sanitizer,
            data_plane,
        }
    }

    /// Embed, sanitize and upsert `records` batch by batch.
    ///
    /// Conversions inside a batch run concurrently and the batch is only
    /// upserted if every one of them succeeds. Batches run strictly one after
    /// another; a failure stops the run with earlier batches already written.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn run_indexing<R: Indexable>(
        &self,
        records: &[R],
        index_name: &str,
        namespace: &str,
        batch_size: usize,
    ) -> VectorIndexResult<UpsertSummary> {
        if records.is_empty() {
            return Err(VectorIndexError::Validation(
                "indexing requires at least one record".to_string(),
            ));
        }
        let splitter = BatchSplitter::new(batch_size)?;
        let total = splitter.total_batches(records.len());
        let handle = self.data_plane.lifecycle().resolve_handle(index_name).await?;

        for (i, batch) in splitter.split(records).into_iter().enumerate() {
            let current = i + 1;
            info!(batch = current, total, size = batch.len(), "Converting batch");

            let vectors = try_join_all(batch.iter().map(|record| self.to_vector_record(record)))
                .await
                .wrap_context(|| {
                    format!(
                        "run_indexing(index={index_name}, namespace={namespace}): \
                         conversion failed in batch {current}/{total}"
                    )
                })?;

            handle.upsert(namespace, vectors).await.wrap_context(|| {
                format!(
                    "run_indexing(index={index_name}, namespace={namespace}): \
                     upsert failed in batch {current}/{total}"
                )
            })?;
        }

        info!(batches = total, "Indexing complete");
        Ok(UpsertSummary {
            batches: total,
            records: records.len(),
        })
    }

    async fn to_vector_record<R: Indexable>(&self, record: &R) -> VectorIndexResult<VectorRecord> {
        let text = record.embedding_text();
        let options = EmbedOptions::retrieval_document(record.title());

        let vectors = self
            .embedder
            .embed(std::slice::from_ref(&text), &options)
            .await
            .wrap_context(|| format!("embed(id={})", record.id()))?;
        let values = vectors.into_iter().next().ok_or_else(|| {
            VectorIndexError::Embedding(format!("no embedding returned for record {}", record.id()))
        })?;

        let metadata = self
            .sanitizer
            .sanitize(record.metadata())
            .wrap_context(|| format!("sanitize(id={})", record.id()))?;

        Ok(VectorRecord::new(record.id(), values).with_metadata(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::lifecycle::IndexLifecycleManager;
    use crate::metadata::{DefaultMetadataSanitizer, MockMetadataSanitizer};
    use crate::error::StoreError;
    use crate::models::{
        DistanceMetric, EmbeddingModel, EmbeddingProviderType, IndexDescriptor, Metadata,
        MetadataValue, TaskType,
    };
    use crate::store::{IndexHandle, MockIndexHandle, MockVectorStore};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn document(id: &str, title: &str, content: &str) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            metadata: json!({"source": {"system": "kb"}}),
        }
    }

    fn data_plane(handle: MockIndexHandle) -> Arc<VectorDataPlane> {
        let handle: Arc<dyn IndexHandle> = Arc::new(handle);
        let mut store = MockVectorStore::new();
        store.expect_describe_index().returning(|name| {
            Ok(IndexDescriptor {
                name: name.to_string(),
                host: "docs-abc.svc.pinecone.io".to_string(),
                dimension: 2,
                metric: DistanceMetric::Cosine,
                ready: true,
            })
        });
        store
            .expect_index()
            .returning(move |_, _| Ok(Arc::clone(&handle)));
        Arc::new(VectorDataPlane::new(Arc::new(IndexLifecycleManager::new(
            Arc::new(store),
        ))))
    }

    /// Deterministic embedding: `[len(text), 1.0]`
    fn length_embedder() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().returning(|texts, options| {
            assert_eq!(options.task_type, Some(TaskType::RetrievalDocument));
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        });
        embedder
    }

    #[test]
    fn test_embedding_text_joins_title_and_content() {
        let doc = document("1", "Refunds", "Within 30 days");
        assert_eq!(doc.embedding_text(), "Refunds\nWithin 30 days");
    }

    #[test]
    fn test_pipeline_config_from_env() {
        temp_env::with_var_unset("VECTOR_BATCH_SIZE", || {
            assert_eq!(PipelineConfig::from_env().unwrap(), PipelineConfig::default());
        });
        temp_env::with_var("VECTOR_BATCH_SIZE", Some("25"), || {
            assert_eq!(PipelineConfig::from_env().unwrap().batch_size, 25);
        });
        temp_env::with_var("VECTOR_BATCH_SIZE", Some("0"), || {
            assert!(PipelineConfig::from_env().is_err());
        });
        temp_env::with_var("VECTOR_BATCH_SIZE", Some("many"), || {
            assert!(PipelineConfig::from_env().is_err());
        });
    }

    #[tokio::test]
    async fn test_three_records_batch_two_gives_two_upserts() {
        let seen: Arc<Mutex<Vec<Vec<VectorRecord>>>> = Arc::default();
        let mut handle = MockIndexHandle::new();
        let sink = Arc::clone(&seen);
        handle.expect_upsert().times(2).returning(move |ns, batch| {
            assert_eq!(ns, "kb");
            sink.lock().unwrap().push(batch);
            Ok(())
        });

        let docs = vec![
            document("a", "T1", "one"),
            document("b", "T2", "three"),
            document("c", "Title3", "x"),
        ];
        let pipeline = IndexingPipeline::new(
            Arc::new(length_embedder()),
            Arc::new(DefaultMetadataSanitizer),
            data_plane(handle),
        );

        let summary = pipeline.run_indexing(&docs, "docs", "kb", 2).await.unwrap();
        assert_eq!(summary, UpsertSummary { batches: 2, records: 3 });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 1]);
        let flattened: Vec<&VectorRecord> = seen.iter().flatten().collect();
        for (record, doc) in flattened.iter().zip(&docs) {
            assert_eq!(record.id, doc.id);
            assert_eq!(record.values, vec![doc.embedding_text().len() as f32, 1.0]);
            assert_eq!(
                record.metadata.get("source.system"),
                Some(&MetadataValue::from("kb"))
            );
        }
    }

    #[tokio::test]
    async fn test_conversion_failure_skips_upsert_for_batch() {
        let mut handle = MockIndexHandle::new();
        handle.expect_upsert().never();

        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().returning(|texts, _| {
            if texts[0].starts_with("bad") {
                Err(VectorIndexError::Embedding("model rejected input".to_string()))
            } else {
                Ok(vec![vec![0.0, 1.0]])
            }
        });

        let docs = vec![
            document("a", "ok", "fine"),
            document("b", "bad", "broken"),
            document("c", "ok", "fine"),
        ];
        let pipeline = IndexingPipeline::new(
            Arc::new(embedder),
            Arc::new(DefaultMetadataSanitizer),
            data_plane(handle),
        );

        let err = pipeline.run_indexing(&docs, "docs", "kb", 3).await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            VectorIndexError::Embedding(msg) if msg == "model rejected input"
        ));
        assert!(err.to_string().contains("batch 1/1"));
        assert!(err.to_string().contains("embed(id=b)"));
    }

    #[tokio::test]
    async fn test_failure_in_second_batch_keeps_first_batch() {
        let mut handle = MockIndexHandle::new();
        handle.expect_upsert().times(1).returning(|_, _| Ok(()));

        let mut sanitizer = MockMetadataSanitizer::new();
        sanitizer.expect_sanitize().returning(|raw| {
            if raw.get("broken").is_some() {
                Err(VectorIndexError::Metadata("unsupported field".to_string()))
            } else {
                Ok(Metadata::new())
            }
        });

        let mut docs = vec![
            document("a", "t", "c"),
            document("b", "t", "c"),
            document("c", "t", "c"),
        ];
        docs[2].metadata = json!({"broken": true});

        let pipeline = IndexingPipeline::new(
            Arc::new(length_embedder()),
            Arc::new(sanitizer),
            data_plane(handle),
        );

        let err = pipeline.run_indexing(&docs, "docs", "kb", 2).await.unwrap_err();
        assert!(err.to_string().contains("batch 2/2"));
        assert!(matches!(err.root_cause(), VectorIndexError::Metadata(_)));
    }

    #[tokio::test]
    async fn test_upsert_failure_reports_pipeline_batch() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut handle = MockIndexHandle::new();
        handle.expect_upsert().times(2).returning(move |_, _| {
            let mut calls = counter.lock().unwrap();
            *calls += 1;
            if *calls == 2 {
                Err(StoreError::Transport("down".to_string()))
            } else {
                Ok(())
            }
        });

        let docs: Vec<Document> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| document(id, "t", "c"))
            .collect();
        let pipeline = IndexingPipeline::new(
            Arc::new(length_embedder()),
            Arc::new(DefaultMetadataSanitizer),
            data_plane(handle),
        );

        let err = pipeline.run_indexing(&docs, "docs", "kb", 2).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("upsert failed in batch 2/2"), "{message}");
        assert!(!message.contains("1/1"), "{message}");
        assert!(matches!(
            err.root_cause(),
            VectorIndexError::Store(StoreError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_conversions_in_a_batch_run_concurrently() {
        const BATCH: usize = 3;
        let barrier = Arc::new(Barrier::new(BATCH));

        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().times(BATCH).returning(|_, _| Ok(vec![vec![0.0, 1.0]]));
        let waiting = GatedEmbedder {
            inner: embedder,
            barrier: Arc::clone(&barrier),
        };

        let mut handle = MockIndexHandle::new();
        handle
            .expect_upsert()
            .times(1)
            .returning(|_, batch| {
                assert_eq!(batch.len(), BATCH);
                Ok(())
            });

        let docs: Vec<Document> = (0..BATCH)
            .map(|i| document(&i.to_string(), "t", "c"))
            .collect();
        let pipeline = IndexingPipeline::new(
            Arc::new(waiting),
            Arc::new(DefaultMetadataSanitizer),
            data_plane(handle),
        );

        // Every conversion waits on the barrier, so only a concurrent fan-out finishes
        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            pipeline.run_indexing(&docs, "docs", "kb", BATCH),
        )
        .await
        .expect("conversions did not run concurrently")
        .unwrap();
        assert_eq!(summary.batches, 1);
    }

    /// Holds each embed call until the whole batch is in flight
    struct GatedEmbedder {
        inner: MockEmbeddingProvider,
        barrier: Arc<Barrier>,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for GatedEmbedder {
        fn provider_type(&self) -> EmbeddingProviderType {
            EmbeddingProviderType::VertexAI
        }

        fn model(&self) -> EmbeddingModel {
            EmbeddingModel::Custom(2)
        }

        async fn embed(
            &self,
            texts: &[String],
            options: &EmbedOptions,
        ) -> VectorIndexResult<Vec<Vec<f32>>> {
            self.barrier.wait().await;
            self.inner.embed(texts, options).await
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_before_any_call() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_embed().never();
        let mut handle = MockIndexHandle::new();
        handle.expect_upsert().never();

        let pipeline = IndexingPipeline::new(
            Arc::new(embedder),
            Arc::new(DefaultMetadataSanitizer),
            data_plane(handle),
        );

        let err = pipeline
            .run_indexing::<Document>(&[], "docs", "kb", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorIndexError::Validation(_)));
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let pipeline = IndexingPipeline::new(
            Arc::new(MockEmbeddingProvider::new()),
            Arc::new(DefaultMetadataSanitizer),
            data_plane(MockIndexHandle::new()),
        );

        let docs = vec![document("a", "t", "c")];
        let err = pipeline.run_indexing(&docs, "docs", "kb", 0).await.unwrap_err();
        assert!(matches!(err, VectorIndexError::Validation(_)));
    }
}
