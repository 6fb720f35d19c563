use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

use super::{PineconeConfig, PineconeIndex, check_status, endpoint};
use crate::error::{StoreError, VectorIndexError, VectorIndexResult};
use crate::models::{
    CreateIndexOptions, DistanceMetric, IndexDeployment, IndexDescriptor, IndexSpec,
};
use crate::store::{IndexHandle, VectorStore};

/// Pinecone-backed implementation of [`VectorStore`]
pub struct PineconeClient {
    http: Client,
    controller: Url,
    config: PineconeConfig,
}

impl PineconeClient {
    pub fn new(config: PineconeConfig) -> VectorIndexResult<Self> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| VectorIndexError::Config("PINECONE_API_KEY is not a valid header value".to_string()))?;
        api_key.set_sensitive(true);
        headers.insert("Api-Key", api_key);
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_str(&config.api_version).map_err(|_| {
                VectorIndexError::Config(format!("invalid Pinecone API version '{}'", config.api_version))
            })?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| VectorIndexError::Config(format!("Failed to build HTTP client: {e}")))?;

        let controller = Url::parse(&config.controller_url).map_err(|e| {
            VectorIndexError::Config(format!("invalid controller URL '{}': {e}", config.controller_url))
        })?;

        Ok(Self {
            http,
            controller,
            config,
        })
    }

    pub fn config(&self) -> &PineconeConfig {
        &self.config
    }

    /// Poll `describe_index` until the index reports ready.
    async fn wait_until_ready(&self, name: &str) -> Result<IndexDescriptor, StoreError> {
        let started = Instant::now();
        let interval = self.config.ready_poll_interval();

        loop {
            let descriptor = self.describe_index(name).await?;
            if descriptor.ready {
                info!(index = name, elapsed_ms = started.elapsed().as_millis() as u64, "Index is ready");
                return Ok(descriptor);
            }

            if let Some(limit) = self.config.ready_timeout() {
                if started.elapsed() >= limit {
                    return Err(StoreError::ReadyTimeout(name.to_string()));
                }
            }

            debug!(index = name, "Index not ready yet, polling again");
            sleep(interval).await;
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: u32,
    metric: DistanceMetric,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

impl From<IndexModel> for IndexDescriptor {
    fn from(model: IndexModel) -> Self {
        IndexDescriptor {
            name: model.name,
            host: model.host,
            dimension: model.dimension,
            metric: model.metric,
            ready: model.status.ready,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: DistanceMetric,
    spec: DeploymentSpec<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum DeploymentSpec<'a> {
    Serverless {
        cloud: String,
        region: &'a str,
    },
    Pod {
        environment: &'a str,
        pod_type: &'a str,
        pods: u32,
    },
}

impl<'a> From<&'a IndexDeployment> for DeploymentSpec<'a> {
    fn from(deployment: &'a IndexDeployment) -> Self {
        match deployment {
            IndexDeployment::Serverless { cloud, region } => DeploymentSpec::Serverless {
                cloud: cloud.to_string(),
                region,
            },
            IndexDeployment::Pod {
                environment,
                pod_type,
                pods,
            } => DeploymentSpec::Pod {
                environment,
                pod_type,
                pods: *pods,
            },
        }
    }
}

#[async_trait]
impl VectorStore for PineconeClient {
    #[instrument(skip(self))]
    async fn describe_index(&self, name: &str) -> Result<IndexDescriptor, StoreError> {
        let url = endpoint(&self.controller, &["indexes", name])?;
        let response = check_status(self.http.get(url).send().await?, name).await?;
        let model: IndexModel = response.json().await?;
        Ok(model.into())
    }

    #[instrument(skip(self, spec), fields(index = %spec.name))]
    async fn create_index(
        &self,
        spec: &IndexSpec,
        options: CreateIndexOptions,
    ) -> Result<(), StoreError> {
        let url = endpoint(&self.controller, &["indexes"])?;
        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: DeploymentSpec::from(&spec.deployment),
        };

        let sent = self.http.post(url).json(&request).send().await?;
        match check_status(sent, &spec.name).await {
            Ok(_) => info!("Create request accepted"),
            Err(StoreError::Conflict(_)) if options.suppress_conflicts => {
                warn!("Index already exists, continuing")
            }
            Err(e) => return Err(e),
        }

        if options.wait_until_ready {
            self.wait_until_ready(&spec.name).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_indexes(&self) -> Result<Vec<IndexDescriptor>, StoreError> {
        let url = endpoint(&self.controller, &["indexes"])?;
        let response = check_status(self.http.get(url).send().await?, "indexes").await?;
        let list: IndexList = response.json().await?;
        Ok(list.indexes.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, name: &str) -> Result<(), StoreError> {
        let url = endpoint(&self.controller, &["indexes", name])?;
        check_status(self.http.delete(url).send().await?, name).await?;
        Ok(())
    }

    fn index(&self, name: &str, host: &str) -> Result<Arc<dyn IndexHandle>, StoreError> {
        Ok(Arc::new(PineconeIndex::new(self.http.clone(), name, host)?))
    }
}
