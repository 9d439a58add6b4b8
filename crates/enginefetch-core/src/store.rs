//! Remote artifact store access.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::CandidateError;

/// Source of remote artifact files.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Download the file at `url` and return its body.
    ///
    /// # Errors
    ///
    /// Returns a [`CandidateError`] classifying why the file is unavailable.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CandidateError>;
}

/// Map an HTTP status to the acquisition error taxonomy; only 200 is usable.
///
/// # Errors
///
/// Returns [`CandidateError::NotYetBuilt`] for 403 and
/// [`CandidateError::OtherHttpError`] for any other status but 200.
pub fn classify_status(url: &str, status: u16) -> Result<(), CandidateError> {
    match status {
        200 => Ok(()),
        403 => Err(CandidateError::NotYetBuilt {
            url: url.to_string(),
        }),
        status => Err(CandidateError::OtherHttpError {
            url: url.to_string(),
            status,
        }),
    }
}

/// [`ArtifactStore`] speaking HTTP(S) through a shared `reqwest` client.
///
/// Timeouts and default headers are configured on the client by the caller; redirects
/// follow the client's policy.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
}

impl HttpStore {
    /// Wrap a configured client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactStore for HttpStore {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CandidateError> {
        let unreachable = |err: reqwest::Error| CandidateError::Unreachable {
            url: url.to_string(),
            message: err.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(unreachable)?;
        classify_status(url, response.status().as_u16())?;
        let body = response.bytes().await.map_err(unreachable)?;
        tracing::debug!(url, bytes = body.len(), "artifact file downloaded");
        Ok(body.to_vec())
    }
}
