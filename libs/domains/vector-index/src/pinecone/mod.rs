//! Pinecone REST adapter: control plane on the controller URL, data plane on
//! each index host.

mod client;
mod config;
mod index;

pub use client::PineconeClient;
pub use config::PineconeConfig;
pub use index::PineconeIndex;

use reqwest::{Response, StatusCode, Url};

use crate::error::StoreError;

/// Map a non-2xx response onto the store taxonomy. `resource` names what the
/// request targeted and ends up in `NotFound`/`Conflict`.
pub(crate) async fn check_status(response: Response, resource: &str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(StoreError::NotFound(resource.to_string())),
        StatusCode::CONFLICT => Err(StoreError::Conflict(resource.to_string())),
        _ => {
            let message = response.text().await.unwrap_or_default();
            Err(StoreError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// `base` with `segments` appended as individually escaped path segments
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, StoreError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::Transport(format!("'{base}' cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Index hosts come back without a scheme
pub(crate) fn host_url(host: &str) -> Result<Url, StoreError> {
    let raw = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    Url::parse(&raw).map_err(|e| StoreError::Transport(format!("invalid host '{host}': {e}")))
}
