//! Vertex AI embedding provider
//!
//! Uses Google Cloud's Vertex AI text embedding `:predict` endpoint.
//! Authentication is either an explicit `GOOGLE_ACCESS_TOKEN` or a token from
//! the GCE/GKE metadata server (Workload Identity).

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::EmbeddingProvider;
use super::provider::ensure_one_per_text;
use crate::error::{VectorIndexError, VectorIndexResult};
use crate::models::{EmbedOptions, EmbeddingModel, EmbeddingProviderType};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Vertex AI provider configuration
#[derive(Debug, Clone)]
pub struct VertexAIConfig {
    /// GCP Project ID
    pub project_id: String,
    /// GCP Region (e.g., "us-central1")
    pub location: String,
    /// Falls back to the metadata server when unset
    pub access_token: Option<String>,
    pub model: EmbeddingModel,
    /// Overrides `https://{location}-aiplatform.googleapis.com`
    pub endpoint: Option<String>,
}

impl VertexAIConfig {
    pub fn new(project_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            access_token: None,
            model: EmbeddingModel::default(),
            endpoint: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_model(mut self, model: EmbeddingModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn predict_url(&self) -> String {
        let base = self
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.location));
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            base.trim_end_matches('/'),
            self.project_id,
            self.location,
            vertex_model_name(self.model)
        )
    }
}

/// Map EmbeddingModel to a Vertex AI publisher model
fn vertex_model_name(model: EmbeddingModel) -> &'static str {
    match model {
        EmbeddingModel::TextEmbedding004 => "text-embedding-004",
        EmbeddingModel::TextEmbedding005 => "text-embedding-005",
        EmbeddingModel::TextMultilingualEmbedding002 => "text-multilingual-embedding-002",
        // Custom dimensions are requested through outputDimensionality
        _ => "text-embedding-004",
    }
}

impl FromEnv for VertexAIConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let project_id = env_optional("GOOGLE_CLOUD_PROJECT")
            .or_else(|| env_optional("GCP_PROJECT_ID"))
            .ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_CLOUD_PROJECT".to_string()))?;

        Ok(Self {
            project_id,
            location: env_or_default("VERTEX_AI_LOCATION", "us-central1"),
            access_token: env_optional("GOOGLE_ACCESS_TOKEN"),
            model: EmbeddingModel::default(),
            endpoint: env_optional("VERTEX_AI_ENDPOINT"),
        })
    }
}

/// Vertex AI embeddings provider
pub struct VertexAIProvider {
    client: Client,
    config: VertexAIConfig,
}

impl VertexAIProvider {
    pub fn new(config: VertexAIConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> VectorIndexResult<Self> {
        Ok(Self::new(VertexAIConfig::from_env()?))
    }

    async fn access_token(&self) -> VectorIndexResult<String> {
        if let Some(token) = &self.config.access_token {
            return Ok(token.clone());
        }
        self.metadata_token().await
    }

    async fn metadata_token(&self) -> VectorIndexResult<String> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let unavailable = |detail: String| {
            VectorIndexError::Config(format!(
                "Failed to get access token from metadata server: {detail}. \
                 Set GOOGLE_ACCESS_TOKEN for local development."
            ))
        };

        let response = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("status {}", response.status())));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<TextInstance<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<PredictParameters>,
}

#[derive(Debug, Serialize)]
struct TextInstance<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    output_dimensionality: u32,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    embeddings: PredictionValues,
}

#[derive(Debug, Deserialize)]
struct PredictionValues {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for VertexAIProvider {
    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::VertexAI
    }

    fn model(&self) -> EmbeddingModel {
        self.config.model
    }

    #[instrument(skip_all, fields(model = vertex_model_name(self.config.model), texts = texts.len()))]
    async fn embed(
        &self,
        texts: &[String],
        options: &EmbedOptions,
    ) -> VectorIndexResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let access_token = self.access_token().await?;
        let task_type = options.task_type.map(|t| t.to_string());

        let request = PredictRequest {
            instances: texts
                .iter()
                .map(|text| TextInstance {
                    content: text,
                    task_type: task_type.clone(),
                    title: options.title.as_deref(),
                })
                .collect(),
            parameters: match self.config.model {
                EmbeddingModel::Custom(dim) => Some(PredictParameters {
                    output_dimensionality: dim,
                }),
                _ => None,
            },
        };

        let response = self
            .client
            .post(self.config.predict_url())
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorIndexError::Embedding(format!("Vertex AI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorIndexError::Embedding(format!(
                "Vertex AI API error ({status}): {error_text}"
            )));
        }

        let body: PredictResponse = response.json().await.map_err(|e| {
            VectorIndexError::Embedding(format!("Invalid Vertex AI response: {e}"))
        })?;
        debug!(predictions = body.predictions.len(), "Vertex AI embeddings received");

        ensure_one_per_text(
            self.provider_type(),
            texts.len(),
            body.predictions
                .into_iter()
                .map(|p| p.embeddings.values)
                .collect(),
        )
    }
}
