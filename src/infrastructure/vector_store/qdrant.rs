//! Qdrant vector store implementation

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Filter, ListValue, PointId, PointStruct,
    SearchPointsBuilder, Struct, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;

use crate::domain::vector_store::Distance;
use crate::domain::{
    CollectionSpec, DomainError, PayloadFilter, ScoredPoint, VectorPoint, VectorQuery,
    VectorStore,
};

/// Vector store backed by a Qdrant server (gRPC API)
pub struct QdrantVectorStore {
    client: Qdrant,
    url: String,
}

impl std::fmt::Debug for QdrantVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantVectorStore")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl QdrantVectorStore {
    /// Connect to Qdrant at `url`, optionally authenticating with an API key
    pub fn connect(url: impl Into<String>, api_key: Option<String>) -> Result<Self, DomainError> {
        let url = url.into();
        let mut builder = Qdrant::from_url(&url);
        if let Some(api_key) = api_key {
            builder = builder.api_key(api_key);
        }

        let client = builder
            .build()
            .map_err(|e| DomainError::vector_store(format!("Failed to create client: {}", e)))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, DomainError> {
        self.client
            .collection_exists(name)
            .await
            .map_err(|e| DomainError::vector_store(format!("Failed to check collection: {}", e)))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), DomainError> {
        let distance = match spec.distance {
            Distance::Cosine => qdrant_client::qdrant::Distance::Cosine,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&spec.name)
                    .vectors_config(VectorParamsBuilder::new(spec.dimensions as u64, distance)),
            )
            .await
            .map_err(|e| {
                DomainError::vector_store(format!("Failed to create collection: {}", e))
            })?;

        Ok(())
    }

    async fn upsert(&self, collection: &str, point: VectorPoint) -> Result<(), DomainError> {
        let payload: HashMap<String, QdrantValue> = point
            .payload
            .into_iter()
            .map(|(key, value)| (key, json_to_qdrant(value)))
            .collect();

        let point = PointStruct::new(point.id, point.vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
            .await
            .map_err(|e| DomainError::vector_store(format!("Failed to upsert point: {}", e)))?;

        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &VectorQuery,
    ) -> Result<Vec<ScoredPoint>, DomainError> {
        let mut search = SearchPointsBuilder::new(
            collection,
            query.vector.clone(),
            query.limit as u64,
        )
        .score_threshold(query.score_threshold)
        .with_payload(true);

        if !query.filter.is_empty() {
            search = search.filter(to_filter(&query.filter));
        }

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| DomainError::vector_store(format!("Failed to query points: {}", e)))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| ScoredPoint {
                id: point.id.map(point_id_string).unwrap_or_default(),
                score: point.score,
                payload: point
                    .payload
                    .into_iter()
                    .map(|(key, value)| (key, qdrant_to_json(value)))
                    .collect(),
            })
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "qdrant"
    }
}

fn to_filter(filter: &PayloadFilter) -> Filter {
    Filter::must(
        filter
            .conditions()
            .iter()
            .map(|(key, value)| Condition::matches(key.clone(), value.clone())),
    )
}

fn point_id_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

fn json_to_qdrant(value: Value) -> QdrantValue {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Kind::StringValue(s),
        Value::Array(values) => Kind::ListValue(ListValue {
            values: values.into_iter().map(json_to_qdrant).collect(),
        }),
        Value::Object(map) => Kind::StructValue(Struct {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, json_to_qdrant(value)))
                .collect(),
        }),
    };

    QdrantValue { kind: Some(kind) }
}

fn qdrant_to_json(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => Value::from(d),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(key, value)| (key, qdrant_to_json(value)))
                .collect(),
        ),
    }
}
