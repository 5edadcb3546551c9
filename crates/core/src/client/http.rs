//! reqwest-backed [`AskClient`].

use super::{AskClient, AskRequest, ChunkStream, TransportError};
use crate::config::{ClientConfig, ConfigError};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub struct HttpAskClient {
    client: Client,
    ask_url: Url,
}

impl HttpAskClient {
    pub fn new(config: &ClientConfig) -> Result<Self, HttpClientError> {
        let endpoint = config.endpoint()?;
        let ask_url = ask_url(endpoint)?;

        let mut builder =
            Client::builder().connect_timeout(Duration::from_millis(config.connect_timeout_ms));
        if let Some(timeout) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout));
        }
        let client = builder
            .build()
            .map_err(|source| TransportError::Network { source })?;

        Ok(Self { client, ask_url })
    }

    pub fn ask_url(&self) -> &Url {
        &self.ask_url
    }
}

/// Construction failures: missing endpoint or a bad URL.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// `<endpoint>/ask`, tolerating a trailing slash on the endpoint.
pub fn ask_url(endpoint: &str) -> Result<Url, TransportError> {
    let joined = format!("{}/ask", endpoint.trim().trim_end_matches('/'));
    let url = Url::parse(&joined).map_err(|e| TransportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: format!("unsupported scheme {}", other),
        }),
    }
}

#[async_trait]
impl AskClient for HttpAskClient {
    async fn ask(&self, request: &AskRequest) -> Result<ChunkStream, TransportError> {
        debug!("POST {} (site: {})", self.ask_url, request.site);

        let response = self
            .client
            .post(self.ask_url.clone())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|source| TransportError::Network { source })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Answer service returned {}", status);
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::Read {
                    message: e.to_string(),
                })
        });
        Ok(stream.boxed())
    }
}
