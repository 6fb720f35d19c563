use thiserror::Error;

/// Failures reported by a remote store adapter.
///
/// `NotFound` is kept distinct so existence probes can turn it into an
/// absent value instead of an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid store response: {0}")]
    Decode(String),

    #[error("Index '{0}' did not become ready in time")]
    ReadyTimeout(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum VectorIndexError {
    /// The targeted index does not exist.
    #[error("Index not found: {index}")]
    NotFound { index: String },

    /// Any other failure, enriched with the operation it happened in.
    #[error("{context}: {source}")]
    Wrapped {
        context: String,
        #[source]
        source: Box<VectorIndexError>,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type VectorIndexResult<T> = Result<T, VectorIndexError>;

impl VectorIndexError {
    pub fn not_found(index: impl Into<String>) -> Self {
        VectorIndexError::NotFound {
            index: index.into(),
        }
    }

    pub fn wrap(context: impl Into<String>, source: impl Into<VectorIndexError>) -> Self {
        VectorIndexError::Wrapped {
            context: context.into(),
            source: Box::new(source.into()),
        }
    }

    /// The innermost error, skipping every `Wrapped` layer.
    pub fn root_cause(&self) -> &VectorIndexError {
        let mut current = self;
        while let VectorIndexError::Wrapped { source, .. } = current {
            current = source;
        }
        current
    }

    /// True only for the resolve-time `NotFound` kind, never for wrapped errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VectorIndexError::NotFound { .. })
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, VectorIndexError::Wrapped { .. })
    }
}

impl From<validator::ValidationErrors> for VectorIndexError {
    fn from(err: validator::ValidationErrors) -> Self {
        VectorIndexError::Validation(err.to_string())
    }
}

impl From<core_config::ConfigError> for VectorIndexError {
    fn from(err: core_config::ConfigError) -> Self {
        VectorIndexError::Config(err.to_string())
    }
}

/// Attach operation context to a fallible result.
pub trait WrapContext<T> {
    fn wrap_context<F>(self, context: F) -> VectorIndexResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> WrapContext<T> for Result<T, E>
where
    E: Into<VectorIndexError>,
{
    fn wrap_context<F>(self, context: F) -> VectorIndexResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| VectorIndexError::wrap(context(), e))
    }
}
