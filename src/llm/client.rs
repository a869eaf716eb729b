//! Transport to the completion service
//!
//! The pipeline only needs "post this request, give me the body as a byte
//! stream", so the transport sits behind [`ChatTransport`]. [`HttpTransport`]
//! is the `reqwest` implementation used by the application.

use crate::llm::config::ClientConfig;
use crate::llm::request::ChatRequest;
use crate::{ParleyError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

/// Response body as it arrives from the transport
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Opens a streaming completion request
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request and return the response body
    ///
    /// Fails with [`ParleyError::NoStreamBody`] when the response carries no
    /// readable body and [`ParleyError::RequestError`] when the request itself
    /// is rejected. Read failures while consuming the body are yielded by the
    /// stream as [`ParleyError::TransportFailure`].
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// HTTP transport posting JSON and streaming the event-stream body
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport from the client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.read_timeout() {
            builder = builder.read_timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ParleyError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        debug!("Posting question to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ParleyError::RequestError(
                        "Request timeout - the service took too long to respond".to_string(),
                    )
                } else if e.is_connect() {
                    ParleyError::RequestError(
                        "Connection error - unable to reach the service".to_string(),
                    )
                } else {
                    ParleyError::RequestError(format!("Network error: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Completion service returned {}", status);
            return Err(ParleyError::RequestError(match status.as_u16() {
                401 => "Authentication failed - check your API key".to_string(),
                403 => "Access forbidden - insufficient permissions".to_string(),
                429 => "Rate limit exceeded - too many requests".to_string(),
                500..=599 => format!("Server error ({}): {}", status, error_text),
                _ => format!("HTTP error {}: {}", status, error_text),
            }));
        }

        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(ParleyError::NoStreamBody(format!(
                "Response {} has no body",
                status
            )));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ParleyError::TransportFailure(e.to_string())));

        Ok(body.boxed())
    }
}
