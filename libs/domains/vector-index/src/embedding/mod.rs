mod openai;
mod provider;
mod vertexai;

pub use openai::{OpenAIConfig, OpenAIProvider};
pub use provider::EmbeddingProvider;
#[cfg(test)]
pub use provider::MockEmbeddingProvider;
pub use vertexai::{VertexAIConfig, VertexAIProvider};
