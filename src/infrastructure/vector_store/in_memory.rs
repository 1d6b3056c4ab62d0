//! In-memory vector store implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::embedding::cosine_similarity;
use crate::domain::{
    CollectionSpec, DomainError, ScoredPoint, VectorPoint, VectorQuery, VectorStore,
};

#[derive(Debug)]
struct Collection {
    spec: CollectionSpec,
    /// Insertion order; ties in score keep this order
    points: Vec<VectorPoint>,
}

/// In-memory vector store using linear search
///
/// Suitable for development and tests. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
    create_calls: AtomicUsize,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points stored in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, |c| c.points.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Snapshot of the points of a collection, in insertion order
    pub fn points(&self, collection: &str) -> Vec<VectorPoint> {
        self.collections
            .read()
            .map(|c| c.get(collection).map(|c| c.points.clone()).unwrap_or_default())
            .unwrap_or_default()
    }

    /// How many times creation was attempted
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, DomainError> {
        let collections = self.collections.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(collections.contains_key(name))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), DomainError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut collections = self.collections.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        if collections.contains_key(&spec.name) {
            return Err(DomainError::vector_store(format!(
                "Collection `{}` already exists",
                spec.name
            )));
        }

        collections.insert(
            spec.name.clone(),
            Collection {
                spec: spec.clone(),
                points: Vec::new(),
            },
        );

        Ok(())
    }

    async fn upsert(&self, collection: &str, point: VectorPoint) -> Result<(), DomainError> {
        let mut collections = self.collections.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        let target = collections.get_mut(collection).ok_or_else(|| {
            DomainError::vector_store(format!("Collection `{}` not found", collection))
        })?;

        if point.vector.len() != target.spec.dimensions {
            return Err(DomainError::vector_store(format!(
                "Vector dimension error: expected dim: {}, got {}",
                target.spec.dimensions,
                point.vector.len()
            )));
        }

        match target.points.iter_mut().find(|p| p.id == point.id) {
            Some(existing) => *existing = point,
            None => target.points.push(point),
        }

        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &VectorQuery,
    ) -> Result<Vec<ScoredPoint>, DomainError> {
        let collections = self.collections.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        let target = collections.get(collection).ok_or_else(|| {
            DomainError::vector_store(format!("Collection `{}` not found", collection))
        })?;

        let mut results: Vec<ScoredPoint> = target
            .points
            .iter()
            .filter(|point| query.filter.matches(&point.payload))
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: cosine_similarity(&query.vector, &point.vector),
                payload: point.payload.clone(),
            })
            .filter(|result| result.score >= query.score_threshold)
            .collect();

        // Stable sort: equal scores keep insertion order
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results.truncate(query.limit);

        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ensure_collection, PayloadFilter};

    const COLLECTION: &str = "test";

    async fn store_with_collection() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store
            .create_collection(&CollectionSpec::cosine(COLLECTION, 2))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_bootstrap_twice_creates_once() {
        let store = InMemoryVectorStore::new();
        let spec = CollectionSpec::cosine(COLLECTION, 2);

        assert!(ensure_collection(&store, &spec).await.unwrap());
        assert!(!ensure_collection(&store, &spec).await.unwrap());

        assert_eq!(store.create_calls(), 1);
        assert!(store.collection_exists(COLLECTION).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_an_error() {
        let store = store_with_collection().await;

        let result = store
            .create_collection(&CollectionSpec::cosine(COLLECTION, 2))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_query_ranks_and_limits() {
        let store = store_with_collection().await;
        store
            .upsert(COLLECTION, VectorPoint::new("far", vec![0.0, 1.0]))
            .await
            .unwrap();
        store
            .upsert(COLLECTION, VectorPoint::new("near", vec![1.0, 0.1]))
            .await
            .unwrap();
        store
            .upsert(COLLECTION, VectorPoint::new("exact", vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = store
            .query(COLLECTION, &VectorQuery::new(vec![1.0, 0.0], 0.5).with_limit(5))
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = store_with_collection().await;
        for id in ["first", "second", "third"] {
            store
                .upsert(COLLECTION, VectorPoint::new(id, vec![1.0, 1.0]))
                .await
                .unwrap();
        }

        let results = store
            .query(COLLECTION, &VectorQuery::new(vec![1.0, 1.0], 0.9))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "first");
    }

    #[tokio::test]
    async fn test_query_applies_filter() {
        let store = store_with_collection().await;
        store
            .upsert(
                COLLECTION,
                VectorPoint::new("a", vec![1.0, 0.0]).with_payload("model", "gpt-4o"),
            )
            .await
            .unwrap();

        let query = VectorQuery::new(vec![1.0, 0.0], 0.5)
            .with_filter(PayloadFilter::new().must_match("model", "gpt-4o-mini"));

        assert!(store.query(COLLECTION, &query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let store = store_with_collection().await;
        store
            .upsert(COLLECTION, VectorPoint::new("a", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert(COLLECTION, VectorPoint::new("a", vec![0.0, 1.0]))
            .await
            .unwrap();

        assert_eq!(store.len(COLLECTION), 1);
        assert_eq!(store.points(COLLECTION)[0].vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let store = store_with_collection().await;

        let result = store
            .upsert(COLLECTION, VectorPoint::new("a", vec![1.0, 0.0, 0.0]))
            .await;

        assert!(matches!(result, Err(DomainError::VectorStore { .. })));
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let store = InMemoryVectorStore::new();

        assert!(store
            .query("nope", &VectorQuery::new(vec![1.0], 0.0))
            .await
            .is_err());
        assert!(store.is_empty("nope"));
    }
}
