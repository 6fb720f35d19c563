//! Process-lifetime cache of index handles, keyed by index name.
//!
//! Created once when the service starts and shared by every data-plane and
//! administrative call. Each name maps to a [`OnceCell`], so concurrent
//! resolvers of the same name await a single initialization instead of each
//! probing the store. A failed initialization leaves the cell empty, which
//! means failures are never cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::error::VectorIndexResult;
use crate::store::IndexHandle;

type Slot = Arc<OnceCell<Arc<dyn IndexHandle>>>;

#[derive(Default)]
pub struct IndexRegistry {
    entries: Mutex<HashMap<String, Slot>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached handle for `name`, if one has been resolved
    pub async fn get(&self, name: &str) -> Option<Arc<dyn IndexHandle>> {
        let entries = self.entries.lock().await;
        entries.get(name).and_then(|slot| slot.get().cloned())
    }

    /// Return the cached handle or run `init` exactly once to produce it.
    ///
    /// The map lock is released before `init` runs; only callers racing on
    /// the same name wait for each other.
    pub async fn get_or_try_insert_with<F, Fut>(
        &self,
        name: &str,
        init: F,
    ) -> VectorIndexResult<Arc<dyn IndexHandle>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = VectorIndexResult<Arc<dyn IndexHandle>>>,
    {
        let slot = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        slot.get_or_try_init(init).await.cloned()
    }

    /// Drop the entry for `name`. Returns whether a resolved handle was removed.
    pub async fn evict(&self, name: &str) -> bool {
        let mut entries = self.entries.lock().await;
        entries
            .remove(name)
            .is_some_and(|slot| slot.initialized())
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.get(name).await.is_some()
    }

    /// Number of resolved handles
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
