use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

use crate::error::{VectorIndexError, VectorIndexResult};

/// Lowercase alphanumerics and hyphens, no leading or trailing hyphen
static INDEX_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap());

fn validate_index_name(name: &str) -> Result<(), ValidationError> {
    if !INDEX_NAME.is_match(name) {
        return Err(ValidationError::new("invalid_index_name"));
    }
    Ok(())
}

/// Distance metric for similarity calculations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    #[strum(to_string = "dotproduct", serialize = "dot-product")]
    DotProduct,
}

/// Resolved description of a remote index.
///
/// Immutable once obtained; a changed descriptor means a different resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub host: String,
    pub dimension: u32,
    pub metric: DistanceMetric,
    pub ready: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Cloud {
    #[default]
    Aws,
    Gcp,
    Azure,
}

/// Where and how the index is provisioned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexDeployment {
    Serverless {
        cloud: Cloud,
        region: String,
    },
    Pod {
        environment: String,
        pod_type: String,
        pods: u32,
    },
}

impl Default for IndexDeployment {
    fn default() -> Self {
        IndexDeployment::Serverless {
            cloud: Cloud::Aws,
            region: "us-east-1".to_string(),
        }
    }
}

/// Input for creating (or getting) an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct IndexSpec {
    #[validate(length(min = 1, max = 45), custom(function = "validate_index_name"))]
    pub name: String,
    #[validate(range(min = 1, max = 20000))]
    pub dimension: u32,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default)]
    pub deployment: IndexDeployment,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, dimension: u32) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: DistanceMetric::default(),
            deployment: IndexDeployment::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_deployment(mut self, deployment: IndexDeployment) -> Self {
        self.deployment = deployment;
        self
    }
}

/// Flags passed along with a create request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateIndexOptions {
    /// Do not return until the index reports ready
    pub wait_until_ready: bool,
    /// Treat "already exists" as success
    pub suppress_conflicts: bool,
}

impl Default for CreateIndexOptions {
    fn default() -> Self {
        Self {
            wait_until_ready: true,
            suppress_conflicts: true,
        }
    }
}

/// A storeable metadata value: scalar or list of strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
    StringList(Vec<String>),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// A vector point with metadata, unique by id within a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Query parameters. Exactly one of `vector` or `id` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub top_k: u32,
    pub vector: Option<Vec<f32>>,
    pub id: Option<String>,
    pub filter: Option<serde_json::Value>,
    pub include_values: bool,
    pub include_metadata: bool,
}

impl QueryOptions {
    pub fn by_vector(vector: Vec<f32>, top_k: u32) -> Self {
        Self {
            top_k,
            vector: Some(vector),
            id: None,
            filter: None,
            include_values: false,
            include_metadata: true,
        }
    }

    pub fn by_id(id: impl Into<String>, top_k: u32) -> Self {
        Self {
            top_k,
            vector: None,
            id: Some(id.into()),
            filter: None,
            include_values: false,
            include_metadata: true,
        }
    }

    pub fn with_filter(mut self, filter: serde_json::Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn validate(&self) -> VectorIndexResult<()> {
        if self.top_k == 0 {
            return Err(VectorIndexError::Validation(
                "top_k must be at least 1".to_string(),
            ));
        }
        match (&self.vector, &self.id) {
            (Some(v), None) if !v.is_empty() => Ok(()),
            (Some(_), None) => Err(VectorIndexError::Validation(
                "query vector must not be empty".to_string(),
            )),
            (None, Some(_)) => Ok(()),
            _ => Err(VectorIndexError::Validation(
                "exactly one of vector or id must be provided".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub namespace: String,
    pub matches: Vec<QueryMatch>,
}

/// Bulk delete selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteManyOptions {
    Ids(Vec<String>),
    Filter(serde_json::Value),
}

impl DeleteManyOptions {
    pub fn validate(&self) -> VectorIndexResult<()> {
        match self {
            DeleteManyOptions::Ids(ids) if ids.is_empty() => Err(VectorIndexError::Validation(
                "at least one id is required".to_string(),
            )),
            DeleteManyOptions::Filter(filter) if !filter.is_object() => Err(
                VectorIndexError::Validation("delete filter must be a JSON object".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Per-namespace statistics, fetched fresh on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub record_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub dimension: u32,
    pub index_fullness: f32,
    pub total_record_count: u64,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

impl IndexStats {
    pub fn namespace(&self, namespace: &str) -> Option<&NamespaceStats> {
        self.namespaces.get(namespace)
    }
}

/// Namespace listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSummary {
    pub name: String,
    #[serde(default)]
    pub record_count: u64,
}

/// Embedding provider types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmbeddingProviderType {
    #[default]
    VertexAI,
    OpenAI,
}

/// Embedding model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// Vertex AI text-embedding-004 (768 dimensions)
    #[default]
    TextEmbedding004,
    /// Vertex AI text-embedding-005 (768 dimensions)
    TextEmbedding005,
    /// Vertex AI text-multilingual-embedding-002 (768 dimensions)
    TextMultilingualEmbedding002,
    /// OpenAI text-embedding-3-small (1536 dimensions)
    TextEmbedding3Small,
    /// OpenAI text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
    /// Model with a requested output dimension
    Custom(u32),
}

impl EmbeddingModel {
    pub fn dimension(&self) -> u32 {
        match self {
            EmbeddingModel::TextEmbedding004
            | EmbeddingModel::TextEmbedding005
            | EmbeddingModel::TextMultilingualEmbedding002 => 768,
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
            EmbeddingModel::Custom(dim) => *dim,
        }
    }

    pub fn model_name(&self) -> &'static str {
        match self {
            EmbeddingModel::TextEmbedding004 => "text-embedding-004",
            EmbeddingModel::TextEmbedding005 => "text-embedding-005",
            EmbeddingModel::TextMultilingualEmbedding002 => "text-multilingual-embedding-002",
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
            EmbeddingModel::Custom(_) => "custom",
        }
    }

    pub fn provider(&self) -> EmbeddingProviderType {
        match self {
            EmbeddingModel::TextEmbedding3Small | EmbeddingModel::TextEmbedding3Large => {
                EmbeddingProviderType::OpenAI
            }
            _ => EmbeddingProviderType::VertexAI,
        }
    }
}

/// Intended downstream use of an embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
    SemanticSimilarity,
    Classification,
    Clustering,
}

/// Per-call hints for the embedding collaborator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbedOptions {
    pub task_type: Option<TaskType>,
    pub title: Option<String>,
}

impl EmbedOptions {
    pub fn retrieval_document(title: impl Into<String>) -> Self {
        Self {
            task_type: Some(TaskType::RetrievalDocument),
            title: Some(title.into()),
        }
    }

    pub fn retrieval_query() -> Self {
        Self {
            task_type: Some(TaskType::RetrievalQuery),
            title: None,
        }
    }
}

/// Generic domain record fed into the indexing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
