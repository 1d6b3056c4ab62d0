//! Points, queries and filters exchanged with a vector store

use std::collections::HashMap;

use serde_json::Value;

/// Distance metric of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
}

/// Shape of a collection: every point in it has `dimensions` components
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimensions: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    /// Create a cosine collection spec
    pub fn cosine(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            distance: Distance::Cosine,
        }
    }
}

/// A point to insert: identifier, vector and JSON payload
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, Value>,
}

impl VectorPoint {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            payload: HashMap::new(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// A query result with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, Value>,
}

impl ScoredPoint {
    /// Read a string payload field
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Conjunction of exact-match conditions on string payload fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFilter {
    must_match: Vec<(String, String)>,
}

impl PayloadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `payload[key] == value`
    pub fn must_match(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.must_match.push((key.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.must_match
    }

    pub fn is_empty(&self) -> bool {
        self.must_match.is_empty()
    }

    /// Evaluate the filter against a payload
    pub fn matches(&self, payload: &HashMap<String, Value>) -> bool {
        self.must_match
            .iter()
            .all(|(key, expected)| payload.get(key).and_then(Value::as_str) == Some(expected))
    }
}

/// Nearest-neighbour query
#[derive(Debug, Clone)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub filter: PayloadFilter,
    /// Results scoring strictly below this are excluded
    pub score_threshold: f32,
    pub limit: usize,
}

impl VectorQuery {
    pub fn new(vector: Vec<f32>, score_threshold: f32) -> Self {
        Self {
            vector,
            filter: PayloadFilter::default(),
            score_threshold,
            limit: 1,
        }
    }

    pub fn with_filter(mut self, filter: PayloadFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_exact_value() {
        let filter = PayloadFilter::new().must_match("model", "gpt-4o");
        let mut payload = HashMap::new();
        payload.insert("model".to_string(), json!("gpt-4o"));

        assert!(filter.matches(&payload));

        payload.insert("model".to_string(), json!("gpt-4o-mini"));
        assert!(!filter.matches(&payload));
    }

    #[test]
    fn test_filter_requires_field_presence() {
        let filter = PayloadFilter::new().must_match("model", "gpt-4o");

        assert!(!filter.matches(&HashMap::new()));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = PayloadFilter::new();

        assert!(filter.is_empty());
        assert!(filter.matches(&HashMap::new()));
    }

    #[test]
    fn test_point_payload_builder() {
        let point = VectorPoint::new("p1", vec![0.1, 0.2])
            .with_payload("answer", "42")
            .with_payload("tokenUsage", 7);

        assert_eq!(point.payload["answer"], json!("42"));
        assert_eq!(point.payload["tokenUsage"], json!(7));
    }

    #[test]
    fn test_query_defaults_to_single_result() {
        let query = VectorQuery::new(vec![1.0], 0.9)
            .with_filter(PayloadFilter::new().must_match("model", "m"));

        assert_eq!(query.limit, 1);
        assert_eq!(query.filter.conditions().len(), 1);
    }
}
