//! Configuration for the vector admin CLI

use core_config::{ConfigError, FromEnv, env_parse_or};
use domain_vector_index::{EmbeddingProviderType, PineconeConfig, PipelineConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub pinecone: PineconeConfig,
    /// Only consulted by commands that embed text
    pub embedding_provider: EmbeddingProviderType,
    pub pipeline: PipelineConfig,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            pinecone: PineconeConfig::from_env()?,
            embedding_provider: env_parse_or("EMBEDDING_PROVIDER", EmbeddingProviderType::default())?,
            pipeline: PipelineConfig::from_env()?,
        })
    }
}
