//! Scripted [`ArtifactStore`] recording every requested URL.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use enginefetch_core::{ArtifactStore, CandidateError, classify_status};

/// Canned answer for one URL.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    /// 200 with the given body.
    Body(Vec<u8>),
    /// Any HTTP status without a usable body.
    Status(u16),
    /// Transport failure before a status is received.
    Unreachable,
}

/// Store double; unknown URLs answer 404.
#[derive(Default)]
pub struct FakeStore {
    responses: HashMap<String, FakeResponse>,
    requests: Mutex<Vec<String>>,
}

impl FakeStore {
    /// Store where every URL is missing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    #[must_use]
    pub fn with_body(self, url: impl Into<String>, body: impl AsRef<[u8]>) -> Self {
        self.with_response(url, FakeResponse::Body(body.as_ref().to_vec()))
    }

    /// Answer `url` with `status`.
    #[must_use]
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.with_response(url, FakeResponse::Status(status))
    }

    /// Fail `url` at the transport level.
    #[must_use]
    pub fn with_unreachable(self, url: impl Into<String>) -> Self {
        self.with_response(url, FakeResponse::Unreachable)
    }

    /// Register an arbitrary response.
    #[must_use]
    pub fn with_response(mut self, url: impl Into<String>, response: FakeResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any requested URL starts with `prefix`.
    #[must_use]
    pub fn requested_under(&self, prefix: &str) -> bool {
        self.requests().iter().any(|url| url.starts_with(prefix))
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, CandidateError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        match self.responses.get(url) {
            Some(FakeResponse::Body(body)) => Ok(body.clone()),
            Some(FakeResponse::Status(status)) => {
                classify_status(url, *status)?;
                Ok(Vec::new())
            }
            Some(FakeResponse::Unreachable) => Err(CandidateError::Unreachable {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
            None => {
                classify_status(url, 404)?;
                Ok(Vec::new())
            }
        }
    }
}
