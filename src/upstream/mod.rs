//! Collaborator interface to the orchestration backend: issue the run
//! request, hand back the raw byte stream. Failures here surface before
//! streaming begins, never as a mid-stream event; retries are the caller's
//! concern.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::core::error::UpstreamError;

pub type ByteStream = Pin<Box<dyn futures_core::Stream<Item = Result<Bytes, UpstreamError>> + Send>>;

#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub stream: bool,
}

impl RunRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
            user_id: None,
            stream: true,
        }
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, request: &RunRequest) -> Result<ByteStream, UpstreamError>;
}

pub struct HttpConnector {
    client: reqwest::Client,
    url: String,
}

impl HttpConnector {
    pub fn new(url: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Http(e.to_string()))?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(UpstreamError::InvalidUrl(url));
        }
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(&self, request: &RunRequest) -> Result<ByteStream, UpstreamError> {
        debug!(url = %self.url, "opening upstream run stream");
        let response = self
            .client
            .post(&self.url)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| UpstreamError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status, message });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| UpstreamError::Stream(e.to_string())));
        Ok(Box::pin(stream))
    }
}
