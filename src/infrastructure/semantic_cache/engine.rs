//! Write-behind semantic cache engine
//!
//! Lookups run inline on the caller's task. Records go through a bounded
//! queue drained by a fixed pool of workers, each of which embeds the prompt
//! and upserts the answer into the vector store. When the queue is full the
//! record is dropped rather than blocking the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    ensure_collection, CacheLookupResult, CacheRecord, CollectionSpec, DomainError,
    EmbeddingProvider, PayloadFilter, SemanticCache, SemanticCacheConfig, VectorPoint,
    VectorQuery, VectorStore,
};
use crate::infrastructure::observability::{
    record_cache_enqueue, record_cache_lookup, record_cache_write, LookupResult, WriteResult,
};

type RecordQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<CacheRecord>>>;

/// Everything a worker needs to persist one record
#[derive(Debug)]
struct Writer {
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Writer {
    async fn write(&self, worker_id: usize, record: CacheRecord) {
        let started = Instant::now();

        let vector = match self.embedder.embed(&record.prompt).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(worker_id, model = %record.model, error = %e, "Failed to embed cache record, discarding");
                record_cache_write(WriteResult::EmbedError, started.elapsed());
                return;
            }
        };

        let point_id = Uuid::new_v4().to_string();
        let model = record.model.clone();
        let point = VectorPoint::new(point_id.clone(), vector)
            .with_payload("question", record.prompt)
            .with_payload("answer", record.response)
            .with_payload("model", record.model)
            .with_payload("tokenUsage", record.token_usage)
            .with_payload("timestamp", Utc::now().timestamp());

        match self.store.upsert(&self.collection, point).await {
            Ok(()) => {
                debug!(worker_id, model = %model, point_id = %point_id, "Stored cache record");
                record_cache_write(WriteResult::Stored, started.elapsed());
            }
            Err(e) => {
                warn!(worker_id, model = %model, error = %e, "Failed to upsert cache record, discarding");
                record_cache_write(WriteResult::UpsertError, started.elapsed());
            }
        }
    }
}

/// In-process semantic cache backed by a vector store
#[derive(Debug)]
pub struct SemanticCacheEngine {
    collection: String,
    similarity_threshold: f32,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    /// `None` once shut down
    sender: Mutex<Option<mpsc::Sender<CacheRecord>>>,
    cancel: CancellationToken,
    workers: TaskTracker,
    stopped: AtomicBool,
}

impl SemanticCacheEngine {
    /// Ensure the collection exists and spawn the worker pool.
    ///
    /// Fails if the configuration is invalid, the embedder's dimensionality
    /// does not match the collection, or the collection cannot be created.
    pub async fn start(
        config: SemanticCacheConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        if embedder.dimensions() != config.dimensions {
            return Err(DomainError::configuration(format!(
                "Embedding provider returns {} dimensions but the cache collection expects {}",
                embedder.dimensions(),
                config.dimensions
            )));
        }

        let spec = CollectionSpec::cosine(&config.collection_name, config.dimensions);
        ensure_collection(store.as_ref(), &spec).await?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let queue: RecordQueue = Arc::new(tokio::sync::Mutex::new(rx));
        let cancel = CancellationToken::new();
        let workers = TaskTracker::new();

        let writer = Arc::new(Writer {
            collection: config.collection_name.clone(),
            embedder: embedder.clone(),
            store: store.clone(),
        });

        for worker_id in 0..config.worker_count {
            workers.spawn(run_worker(
                worker_id,
                writer.clone(),
                queue.clone(),
                cancel.clone(),
            ));
        }

        info!(
            collection = %config.collection_name,
            workers = config.worker_count,
            queue_capacity = config.queue_capacity,
            threshold = config.similarity_threshold,
            embedder = embedder.provider_name(),
            store = store.backend_name(),
            "Semantic cache engine started"
        );

        Ok(Self {
            collection: config.collection_name,
            similarity_threshold: config.similarity_threshold,
            embedder,
            store,
            sender: Mutex::new(Some(tx)),
            cancel,
            workers,
            stopped: AtomicBool::new(false),
        })
    }

    async fn search(&self, prompt: &str, model: &str) -> Result<CacheLookupResult, DomainError> {
        let vector = self.embedder.embed(prompt).await?;

        let query = VectorQuery::new(vector, self.similarity_threshold)
            .with_filter(PayloadFilter::new().must_match("model", model))
            .with_limit(1);

        let results = self.store.query(&self.collection, &query).await?;

        Ok(results
            .into_iter()
            .next()
            .and_then(|point| point.payload_str("answer").map(str::to_owned))
            .map(CacheLookupResult::hit)
            .unwrap_or_else(CacheLookupResult::miss))
    }
}

#[async_trait]
impl SemanticCache for SemanticCacheEngine {
    async fn lookup(&self, prompt: &str, model: &str) -> Result<CacheLookupResult, DomainError> {
        let started = Instant::now();
        let result = self.search(prompt, model).await;

        let label = match &result {
            Ok(r) if r.hit => LookupResult::Hit,
            Ok(_) => LookupResult::Miss,
            Err(_) => LookupResult::Error,
        };
        record_cache_lookup(label, started.elapsed());
        debug!(model = %model, result = ?label, "Semantic cache lookup");

        result
    }

    async fn record(&self, record: CacheRecord) -> bool {
        let accepted = {
            let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            match sender.as_ref() {
                Some(tx) => match tx.try_send(record) {
                    Ok(()) => true,
                    Err(TrySendError::Full(record)) => {
                        warn!(model = %record.model, "Cache write queue full, dropping record");
                        false
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
                None => {
                    debug!("Cache engine stopped, dropping record");
                    false
                }
            }
        };

        record_cache_enqueue(accepted);
        accepted
    }

    async fn shutdown(&self) {
        {
            // Holding the sender lock keeps `record` from racing the close
            let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            self.cancel.cancel();
            *sender = None;
        }

        self.workers.close();
        self.workers.wait().await;

        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!(collection = %self.collection, "Semantic cache engine stopped");
        }
    }
}

async fn run_worker(
    worker_id: usize,
    writer: Arc<Writer>,
    queue: RecordQueue,
    cancel: CancellationToken,
) {
    debug!(worker_id, "Cache worker started");

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            record = async { queue.lock().await.recv().await } => record,
        };

        match next {
            Some(record) => writer.write(worker_id, record).await,
            None => {
                debug!(worker_id, "Cache queue closed and drained");
                return;
            }
        }
    }

    // Cancelled: the queue no longer accepts records, finish what is left
    loop {
        let next = queue.lock().await.try_recv();
        match next {
            Ok(record) => writer.write(worker_id, record).await,
            Err(_) => break,
        }
    }

    debug!(worker_id, "Cache worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cosine_similarity;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::infrastructure::vector_store::InMemoryVectorStore;
    use serde_json::json;
    use tokio::sync::{Notify, Semaphore};

    const COLLECTION: &str = "llm_semantic_cache";

    fn config(dimensions: usize) -> SemanticCacheConfig {
        SemanticCacheConfig::new()
            .with_collection_name(COLLECTION)
            .with_dimensions(dimensions)
    }

    async fn start(
        config: SemanticCacheConfig,
        embedder: impl EmbeddingProvider + 'static,
        store: Arc<InMemoryVectorStore>,
    ) -> SemanticCacheEngine {
        SemanticCacheEngine::start(config, Arc::new(embedder), store)
            .await
            .unwrap()
    }

    /// Embedder that parks every call until released
    #[derive(Debug)]
    struct GatedEmbedder {
        inner: MockEmbeddingProvider,
        entered: Notify,
        gate: Semaphore,
    }

    impl GatedEmbedder {
        fn new(dimensions: usize) -> Self {
            Self {
                inner: MockEmbeddingProvider::new(dimensions),
                entered: Notify::new(),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for GatedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
            self.entered.notify_one();
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| DomainError::internal(e.to_string()))?;
            self.inner.embed(text).await
        }

        fn provider_name(&self) -> &'static str {
            "gated"
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let store = Arc::new(InMemoryVectorStore::new());

        let first = start(config(4), MockEmbeddingProvider::new(4), store.clone()).await;
        let second = start(config(4), MockEmbeddingProvider::new(4), store.clone()).await;

        assert_eq!(store.create_calls(), 1);
        assert!(store.collection_exists(COLLECTION).await.unwrap());

        first.shutdown().await;
        second.shutdown().await;
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails_startup() {
        let result = SemanticCacheEngine::start(
            config(8),
            Arc::new(MockEmbeddingProvider::new(4)),
            Arc::new(InMemoryVectorStore::new()),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_recorded_answer_is_found_with_payload() {
        let store = Arc::new(InMemoryVectorStore::new());
        let engine = start(config(16), MockEmbeddingProvider::new(16), store.clone()).await;

        assert!(
            engine
                .record(CacheRecord::new("What is Rust?", "A language.", "gpt-4o", 12))
                .await
        );
        engine.shutdown().await;

        let points = store.points(COLLECTION);
        assert_eq!(points.len(), 1);
        let payload = &points[0].payload;
        assert_eq!(payload["question"], json!("What is Rust?"));
        assert_eq!(payload["answer"], json!("A language."));
        assert_eq!(payload["model"], json!("gpt-4o"));
        assert_eq!(payload["tokenUsage"], json!(12));
        assert!(payload["timestamp"].as_i64().unwrap() > 0);
        assert!(Uuid::parse_str(&points[0].id).is_ok());

        let result = engine.lookup("What is Rust?", "gpt-4o").await.unwrap();
        assert_eq!(result, CacheLookupResult::hit("A language."));
    }

    #[tokio::test]
    async fn test_lookup_is_deterministic_and_read_only() {
        let store = Arc::new(InMemoryVectorStore::new());
        let engine = start(config(16), MockEmbeddingProvider::new(16), store.clone()).await;
        engine
            .record(CacheRecord::new("ping", "pong", "gpt-4o", 1))
            .await;
        engine.shutdown().await;

        let first = engine.lookup("ping", "gpt-4o").await.unwrap();
        let second = engine.lookup("ping", "gpt-4o").await.unwrap();
        let third = engine.lookup("ping", "gpt-4o").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert!(first.hit);
        assert_eq!(store.len(COLLECTION), 1);
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let query = vec![1.0, 0.0];
        let stored = vec![0.8, 0.6];
        let score = cosine_similarity(&query, &stored);
        let just_above = f32::from_bits(score.to_bits() + 1);

        for (threshold, expect_hit) in [(score, true), (just_above, false)] {
            let store = Arc::new(InMemoryVectorStore::new());
            let embedder = MockEmbeddingProvider::new(2).with_vector("query", query.clone());
            let engine = start(
                config(2).with_similarity_threshold(threshold),
                embedder,
                store.clone(),
            )
            .await;

            store
                .upsert(
                    COLLECTION,
                    VectorPoint::new("p", stored.clone())
                        .with_payload("model", "gpt-4o")
                        .with_payload("answer", "stored"),
                )
                .await
                .unwrap();

            let result = engine.lookup("query", "gpt-4o").await.unwrap();
            assert_eq!(result.hit, expect_hit, "threshold {}", threshold);

            engine.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_models_are_isolated() {
        let store = Arc::new(InMemoryVectorStore::new());
        let engine = start(config(16), MockEmbeddingProvider::new(16), store.clone()).await;

        engine
            .record(CacheRecord::new("Tell me a joke", "from A", "model-a", 5))
            .await;
        engine
            .record(CacheRecord::new("Tell me a joke", "from B", "model-b", 5))
            .await;
        engine.shutdown().await;

        let a = engine.lookup("Tell me a joke", "model-a").await.unwrap();
        let b = engine.lookup("Tell me a joke", "model-b").await.unwrap();
        let c = engine.lookup("Tell me a joke", "model-c").await.unwrap();

        assert_eq!(a, CacheLookupResult::hit("from A"));
        assert_eq!(b, CacheLookupResult::hit("from B"));
        assert_eq!(c, CacheLookupResult::miss());
    }

    #[tokio::test]
    async fn test_queue_full_drops_overflow_and_keeps_accepted() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(GatedEmbedder::new(8));
        let engine = SemanticCacheEngine::start(
            config(8).with_worker_count(1).with_queue_capacity(3),
            embedder.clone(),
            store.clone(),
        )
        .await
        .unwrap();

        // Occupy the only worker
        assert!(engine.record(CacheRecord::new("p0", "a0", "m", 1)).await);
        embedder.entered.notified().await;

        let accepted: Vec<bool> = {
            let mut accepted = Vec::new();
            for i in 1..=5 {
                accepted.push(
                    engine
                        .record(CacheRecord::new(format!("p{}", i), "a", "m", 1))
                        .await,
                );
            }
            accepted
        };
        assert_eq!(accepted, vec![true, true, true, false, false]);

        embedder.gate.add_permits(16);
        engine.shutdown().await;

        assert_eq!(store.len(COLLECTION), 4);
        let questions: Vec<String> = store
            .points(COLLECTION)
            .iter()
            .filter_map(|p| p.payload["question"].as_str().map(str::to_owned))
            .collect();
        assert_eq!(questions, vec!["p0", "p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_rejects_records() {
        let engine = start(
            config(4),
            MockEmbeddingProvider::new(4),
            Arc::new(InMemoryVectorStore::new()),
        )
        .await;

        engine.shutdown().await;
        engine.shutdown().await;

        assert!(!engine.record(CacheRecord::new("late", "x", "m", 0)).await);
    }

    #[tokio::test]
    async fn test_failed_write_is_discarded() {
        let store = Arc::new(InMemoryVectorStore::new());
        let engine = start(
            config(4),
            MockEmbeddingProvider::new(4).with_error("embedding API down"),
            store.clone(),
        )
        .await;

        assert!(engine.record(CacheRecord::new("q", "a", "m", 0)).await);
        engine.shutdown().await;

        assert!(store.is_empty(COLLECTION));
    }

    #[tokio::test]
    async fn test_lookup_errors_are_surfaced() {
        let engine = start(
            config(4),
            MockEmbeddingProvider::new(4).with_error("embedding API down"),
            Arc::new(InMemoryVectorStore::new()),
        )
        .await;

        let result = engine.lookup("q", "m").await;

        assert!(matches!(result, Err(DomainError::Embedding { .. })));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_point_without_answer_is_a_miss() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = MockEmbeddingProvider::new(2).with_vector("q", vec![1.0, 0.0]);
        let engine = start(config(2), embedder, store.clone()).await;
        store
            .upsert(
                COLLECTION,
                VectorPoint::new("p", vec![1.0, 0.0]).with_payload("model", "m"),
            )
            .await
            .unwrap();

        assert_eq!(engine.lookup("q", "m").await.unwrap(), CacheLookupResult::miss());
        engine.shutdown().await;
    }
}
