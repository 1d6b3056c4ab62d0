//! Vector store trait

use std::fmt::Debug;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::point::{CollectionSpec, ScoredPoint, VectorPoint, VectorQuery};
use crate::domain::DomainError;

/// Trait for vector database backends (Qdrant, in-memory, ...)
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Check whether a collection exists
    async fn collection_exists(&self, name: &str) -> Result<bool, DomainError>;

    /// Create a collection
    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), DomainError>;

    /// Insert or replace a point
    async fn upsert(&self, collection: &str, point: VectorPoint) -> Result<(), DomainError>;

    /// Ranked nearest neighbours scoring at or above the query threshold.
    ///
    /// Ordering is defined by the backend; callers must not re-rank.
    async fn query(
        &self,
        collection: &str,
        query: &VectorQuery,
    ) -> Result<Vec<ScoredPoint>, DomainError>;

    /// Get the backend name
    fn backend_name(&self) -> &'static str;
}

/// Make sure a collection exists, creating it if absent.
///
/// Check-then-create is not atomic across processes: when creation fails
/// because another instance won the race, the collection is re-checked and
/// the failure is ignored. Returns `true` when this call created it.
pub async fn ensure_collection(
    store: &dyn VectorStore,
    spec: &CollectionSpec,
) -> Result<bool, DomainError> {
    if store.collection_exists(&spec.name).await? {
        debug!(collection = %spec.name, "Vector collection already exists");
        return Ok(false);
    }

    match store.create_collection(spec).await {
        Ok(()) => {
            info!(
                collection = %spec.name,
                dimensions = spec.dimensions,
                backend = store.backend_name(),
                "Created vector collection"
            );
            Ok(true)
        }
        Err(e) => {
            if store.collection_exists(&spec.name).await? {
                warn!(
                    collection = %spec.name,
                    error = %e,
                    "Collection was created concurrently, continuing"
                );
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Store whose create call always fails, optionally after another
    /// process has created the collection.
    #[derive(Debug, Default)]
    struct RacingStore {
        exists: AtomicBool,
        created_by_other: bool,
        create_calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorStore for RacingStore {
        async fn collection_exists(&self, _name: &str) -> Result<bool, DomainError> {
            Ok(self.exists.load(Ordering::SeqCst))
        }

        async fn create_collection(&self, _spec: &CollectionSpec) -> Result<(), DomainError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.created_by_other {
                self.exists.store(true, Ordering::SeqCst);
            }
            Err(DomainError::vector_store("collection already exists"))
        }

        async fn upsert(&self, _collection: &str, _point: VectorPoint) -> Result<(), DomainError> {
            Ok(())
        }

        async fn query(
            &self,
            _collection: &str,
            _query: &VectorQuery,
        ) -> Result<Vec<ScoredPoint>, DomainError> {
            Ok(Vec::new())
        }

        fn backend_name(&self) -> &'static str {
            "racing"
        }
    }

    #[tokio::test]
    async fn test_existing_collection_is_not_recreated() {
        let store = RacingStore::default();
        store.exists.store(true, Ordering::SeqCst);

        let created = ensure_collection(&store, &CollectionSpec::cosine("c", 4))
            .await
            .unwrap();

        assert!(!created);
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_create_is_tolerated() {
        let store = RacingStore {
            created_by_other: true,
            ..Default::default()
        };

        let created = ensure_collection(&store, &CollectionSpec::cosine("c", 4))
            .await
            .unwrap();

        assert!(!created);
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_genuine_create_failure_is_reported() {
        let store = RacingStore::default();

        let result = ensure_collection(&store, &CollectionSpec::cosine("c", 4)).await;

        assert!(matches!(result, Err(DomainError::VectorStore { .. })));
    }
}
