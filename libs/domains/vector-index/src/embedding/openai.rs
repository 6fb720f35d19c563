use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::EmbeddingProvider;
use super::provider::ensure_one_per_text;
use crate::error::{VectorIndexError, VectorIndexResult};
use crate::models::{EmbedOptions, EmbeddingModel, EmbeddingProviderType};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI embedding provider configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: EmbeddingModel,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: EmbeddingModel::TextEmbedding3Small,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: EmbeddingModel) -> Self {
        self.model = model;
        self
    }
}

impl FromEnv for OpenAIConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_required("OPENAI_API_KEY")?,
            base_url: env_or_default("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: EmbeddingModel::TextEmbedding3Small,
        })
    }
}

/// OpenAI embeddings provider. Task type and title hints are not supported
/// by the API and are ignored.
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> VectorIndexResult<Self> {
        Ok(Self::new(OpenAIConfig::from_env()?))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'static str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::OpenAI
    }

    fn model(&self) -> EmbeddingModel {
        self.config.model
    }

    #[instrument(skip_all, fields(model = self.config.model.model_name(), texts = texts.len()))]
    async fn embed(
        &self,
        texts: &[String],
        _options: &EmbedOptions,
    ) -> VectorIndexResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (model, dimensions) = match self.config.model {
            EmbeddingModel::Custom(dim) => (EmbeddingModel::TextEmbedding3Small.model_name(), Some(dim)),
            other => (other.model_name(), None),
        };

        let request = EmbeddingRequest {
            model,
            input: texts,
            dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorIndexError::Embedding(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorIndexError::Embedding(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| VectorIndexError::Embedding(format!("Invalid OpenAI response: {e}")))?;

        // The API tags each embedding with its input position
        let mut data = body.data;
        data.sort_by_key(|d| d.index);
        debug!(embeddings = data.len(), "OpenAI embeddings received");

        ensure_one_per_text(
            self.provider_type(),
            texts.len(),
            data.into_iter().map(|d| d.embedding).collect(),
        )
    }
}
