use std::sync::Arc;

use tracing::{debug, info, instrument};
use validator::Validate;

use crate::error::{StoreError, VectorIndexError, VectorIndexResult, WrapContext};
use crate::models::{CreateIndexOptions, IndexDescriptor, IndexSpec};
use crate::registry::IndexRegistry;
use crate::store::{IndexHandle, VectorStore};

/// Existence checks, create-or-get provisioning and cached handle resolution
pub struct IndexLifecycleManager {
    store: Arc<dyn VectorStore>,
    registry: Arc<IndexRegistry>,
}

impl IndexLifecycleManager {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self::with_registry(store, Arc::new(IndexRegistry::new()))
    }

    pub fn with_registry(store: Arc<dyn VectorStore>, registry: Arc<IndexRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Probe the store for `name`.
    ///
    /// A store-level `NotFound` becomes `Ok(None)`; every other failure is
    /// wrapped with the call site.
    #[instrument(skip(self))]
    pub async fn check_exists(&self, name: &str) -> VectorIndexResult<Option<IndexDescriptor>> {
        match self.store.describe_index(name).await {
            Ok(descriptor) => {
                debug!(host = %descriptor.host, ready = descriptor.ready, "Index found");
                Ok(Some(descriptor))
            }
            Err(StoreError::NotFound(_)) => {
                debug!("Index not found");
                Ok(None)
            }
            Err(e) => Err(VectorIndexError::wrap(
                format!("check_exists(index={name}): error checking if index exists"),
                e,
            )),
        }
    }

    /// Return a handle for `spec.name`, creating the index first if absent.
    #[instrument(skip(self, spec), fields(index = %spec.name, dimension = spec.dimension))]
    pub async fn get_or_create(&self, spec: &IndexSpec) -> VectorIndexResult<Arc<dyn IndexHandle>> {
        spec.validate()?;

        match self.check_exists(&spec.name).await? {
            Some(existing) => {
                info!(host = %existing.host, "Index already exists, reusing it");
                self.handle_for(&existing)
            }
            None => {
                info!("Index does not exist, creating it");
                self.create_and_wait(spec).await
            }
        }
    }

    /// Create the index, block until ready, then re-probe for its host.
    async fn create_and_wait(&self, spec: &IndexSpec) -> VectorIndexResult<Arc<dyn IndexHandle>> {
        let context = || format!("create_and_wait(index={}): error creating index", spec.name);

        self.store
            .create_index(spec, CreateIndexOptions::default())
            .await
            .wrap_context(context)?;
        info!(index = %spec.name, "Index created and ready");

        let descriptor = self
            .store
            .describe_index(&spec.name)
            .await
            .wrap_context(context)?;
        info!(index = %spec.name, host = %descriptor.host, "Retrieved host for new index");

        self.store
            .index(&descriptor.name, &descriptor.host)
            .wrap_context(context)
    }

    /// Cache-aside handle resolution.
    ///
    /// A hit makes no network call. A miss probes once; an absent index
    /// fails with [`VectorIndexError::NotFound`], a present one is cached.
    #[instrument(skip(self))]
    pub async fn resolve_handle(&self, name: &str) -> VectorIndexResult<Arc<dyn IndexHandle>> {
        if let Some(handle) = self.registry.get(name).await {
            debug!("Cache hit");
            return Ok(handle);
        }

        debug!("Cache miss, probing index");
        self.registry
            .get_or_try_insert_with(name, || async {
                let descriptor = self
                    .check_exists(name)
                    .await?
                    .ok_or_else(|| VectorIndexError::not_found(name))?;

                let handle = self.handle_for(&descriptor)?;
                info!(host = %descriptor.host, "Index handle cached");
                Ok(handle)
            })
            .await
    }

    /// Build a handle from a known descriptor without touching the cache
    pub fn handle_for(&self, descriptor: &IndexDescriptor) -> VectorIndexResult<Arc<dyn IndexHandle>> {
        self.store
            .index(&descriptor.name, &descriptor.host)
            .wrap_context(|| {
                format!(
                    "handle_for(index={}, host={}): error creating index handle",
                    descriptor.name, descriptor.host
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DistanceMetric;
    use crate::store::{MockIndexHandle, MockVectorStore};
    use mockall::predicate::eq;

    fn descriptor(name: &str) -> IndexDescriptor {
        IndexDescriptor {
            name: name.to_string(),
            host: format!("{name}-abc.svc.pinecone.io"),
            dimension: 768,
            metric: DistanceMetric::Cosine,
            ready: true,
        }
    }

    fn handle() -> Arc<dyn IndexHandle> {
        Arc::new(MockIndexHandle::new())
    }

    fn manager(store: MockVectorStore) -> IndexLifecycleManager {
        IndexLifecycleManager::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_check_exists_returns_descriptor() {
        let mut store = MockVectorStore::new();
        store
            .expect_describe_index()
            .with(eq("docs"))
            .returning(|name| Ok(descriptor(name)));

        let found = manager(store).check_exists("docs").await.unwrap();
        assert_eq!(found, Some(descriptor("docs")));
    }

    #[tokio::test]
    async fn test_check_exists_maps_not_found_to_none() {
        let mut store = MockVectorStore::new();
        store
            .expect_describe_index()
            .returning(|name| Err(StoreError::NotFound(name.to_string())));

        assert_eq!(manager(store).check_exists("docs").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_check_exists_wraps_other_errors() {
        let mut store = MockVectorStore::new();
        store.expect_describe_index().returning(|_| {
            Err(StoreError::Api {
                status: 500,
                message: "internal".to_string(),
            })
        });

        let err = manager(store).check_exists("docs").await.unwrap_err();
        assert!(err.is_wrapped());
        assert!(err.to_string().contains("check_exists(index=docs)"));
        assert!(matches!(
            err.root_cause(),
            VectorIndexError::Store(StoreError::Api { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_existing_index() {
        let mut store = MockVectorStore::new();
        store
            .expect_describe_index()
            .times(1)
            .returning(|name| Ok(descriptor(name)));
        store.expect_create_index().never();
        store
            .expect_index()
            .with(eq("docs"), eq("docs-abc.svc.pinecone.io"))
            .times(1)
            .returning(|_, _| Ok(handle()));

        manager(store)
            .get_or_create(&IndexSpec::new("docs", 768))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_or_create_creates_with_wait_and_conflict_suppression() {
        let mut store = MockVectorStore::new();
        let mut probes = 0;
        store.expect_describe_index().times(2).returning(move |name| {
            probes += 1;
            if probes == 1 {
                Err(StoreError::NotFound(name.to_string()))
            } else {
                Ok(descriptor(name))
            }
        });
        store
            .expect_create_index()
            .withf(|spec, options| {
                spec.name == "docs" && options.wait_until_ready && options.suppress_conflicts
            })
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_index()
            .with(eq("docs"), eq("docs-abc.svc.pinecone.io"))
            .times(1)
            .returning(|_, _| Ok(handle()));

        manager(store)
            .get_or_create(&IndexSpec::new("docs", 768))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_or_create_wraps_create_failure() {
        let mut store = MockVectorStore::new();
        store
            .expect_describe_index()
            .times(1)
            .returning(|name| Err(StoreError::NotFound(name.to_string())));
        store.expect_create_index().returning(|_, _| {
            Err(StoreError::Api {
                status: 403,
                message: "quota exceeded".to_string(),
            })
        });

        let err = manager(store)
            .get_or_create(&IndexSpec::new("docs", 768))
            .await
            .err()
            .unwrap();
        assert!(err.is_wrapped());
        assert!(err.to_string().contains("create_and_wait(index=docs)"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_get_or_create_wraps_post_create_probe_failure() {
        let mut store = MockVectorStore::new();
        let mut probes = 0;
        store.expect_describe_index().times(2).returning(move |name| {
            probes += 1;
            if probes == 1 {
                Err(StoreError::NotFound(name.to_string()))
            } else {
                Err(StoreError::Transport("connection reset".to_string()))
            }
        });
        store.expect_create_index().returning(|_, _| Ok(()));
        store.expect_index().never();

        let err = manager(store)
            .get_or_create(&IndexSpec::new("docs", 768))
            .await
            .err()
            .unwrap();
        assert!(err.is_wrapped());
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_get_or_create_rejects_invalid_spec_before_network() {
        let mut store = MockVectorStore::new();
        store.expect_describe_index().never();

        let err = manager(store)
            .get_or_create(&IndexSpec::new("Bad_Name", 768))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, VectorIndexError::Validation(_)));
    }

    #[tokio::test]
    async fn test_resolve_handle_probes_once_per_name() {
        let mut store = MockVectorStore::new();
        store
            .expect_describe_index()
            .with(eq("docs"))
            .times(1)
            .returning(|name| Ok(descriptor(name)));
        store
            .expect_describe_index()
            .with(eq("faq"))
            .times(1)
            .returning(|name| Ok(descriptor(name)));
        store.expect_index().times(2).returning(|_, _| Ok(handle()));

        let manager = manager(store);
        for _ in 0..5 {
            manager.resolve_handle("docs").await.unwrap();
            manager.resolve_handle("faq").await.unwrap();
        }
        assert_eq!(manager.registry().len().await, 2);
    }

    #[tokio::test]
    async fn test_resolve_handle_not_found_is_distinct_kind() {
        let mut store = MockVectorStore::new();
        store
            .expect_describe_index()
            .times(2)
            .returning(|name| Err(StoreError::NotFound(name.to_string())));
        store.expect_index().never();

        let manager = manager(store);
        for _ in 0..2 {
            let err = manager.resolve_handle("missing").await.err().unwrap();
            assert!(err.is_not_found(), "expected NotFound, got {err:?}");
            assert!(!err.is_wrapped());
        }
        assert!(manager.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_resolve_handle_after_eviction_reprobes() {
        let mut store = MockVectorStore::new();
        store
            .expect_describe_index()
            .times(2)
            .returning(|name| Ok(descriptor(name)));
        store.expect_index().times(2).returning(|_, _| Ok(handle()));

        let manager = manager(store);
        manager.resolve_handle("docs").await.unwrap();
        manager.registry().evict("docs").await;
        manager.resolve_handle("docs").await.unwrap();
    }
}
