//! Ask Client
//!
//! Transport collaborator: sends one query to the answer service and hands
//! back the raw response body as a stream of byte chunks. Decoding the
//! chunks is the stream module's job.

pub mod http;

pub use http::HttpAskClient;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport errors. Any of these ends the session as a failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Network error: {source}")]
    Network { source: reqwest::Error },

    #[error("Invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("Stream read failed: {message}")]
    Read { message: String },
}

/// Response body chunks in arrival order.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Body of a `POST <endpoint>/ask` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
    pub site: String,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sites: Vec<String>,
    /// Earlier user queries of the same conversation, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prev: Vec<String>,
}

impl AskRequest {
    pub fn new(query: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            site: site.into(),
            mode: "answer".to_string(),
            sites: Vec::new(),
            prev: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_sites(mut self, sites: Vec<String>) -> Self {
        self.sites = sites;
        self
    }

    pub fn with_prev(mut self, prev: Vec<String>) -> Self {
        self.prev = prev;
        self
    }
}

/// Issues one request attempt per call; no retry.
#[async_trait]
pub trait AskClient: Send + Sync {
    /// Resolves once the response headers arrived with a success status.
    async fn ask(&self, request: &AskRequest) -> Result<ChunkStream, TransportError>;
}
