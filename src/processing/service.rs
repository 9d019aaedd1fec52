//! Backend processing call.
//!
//! One request, one response: the service returns the locator of the
//! processed file or a [`LitlistenError::ProcessingFailure`] carrying the
//! backend's message. No retries.

use crate::error::{LitlistenError, Result};
use crate::processing::request::ProcessingRequest;
#[cfg(feature = "http")]
use crate::processing::request::{WireFailure, WireSuccess};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trait for the external transformation backend.
#[async_trait::async_trait]
pub trait ProcessingService: Send + Sync {
    /// Run `request` and return the processed file's locator.
    async fn process(&self, request: &ProcessingRequest) -> Result<String>;
}

#[async_trait::async_trait]
impl<T: ProcessingService + ?Sized> ProcessingService for Arc<T> {
    async fn process(&self, request: &ProcessingRequest) -> Result<String> {
        (**self).process(request).await
    }
}

/// HTTP client for the `POST {base_url}/process` endpoint.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpProcessingService {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpProcessingService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LitlistenError::Other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/process", self.base_url)
    }
}

#[cfg(feature = "http")]
#[async_trait::async_trait]
impl ProcessingService for HttpProcessingService {
    async fn process(&self, request: &ProcessingRequest) -> Result<String> {
        let body = serde_json::to_string(&request.to_wire())
            .map_err(|e| LitlistenError::Other(format!("Failed to encode request: {e}")))?;
        log::debug!(target: "processing", "POST {} {}", self.endpoint(), body);

        let response = self
            .client
            .post(self.endpoint())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| LitlistenError::ProcessingFailure {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LitlistenError::ProcessingFailure {
                message: format!("failed to read response: {e}"),
            })?;

        if !status.is_success() {
            return Err(LitlistenError::ProcessingFailure {
                message: failure_message(status.as_u16(), &text),
            });
        }

        let success: WireSuccess =
            serde_json::from_str(&text).map_err(|e| LitlistenError::ProcessingFailure {
                message: format!("unexpected response: {e}"),
            })?;
        Ok(success.url)
    }
}

/// Pull the backend's `error` message out of a failed response body.
#[cfg(feature = "http")]
fn failure_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<WireFailure>(body) {
        Ok(failure) if !failure.error.is_empty() => failure.error,
        _ => format!("backend returned status {status}"),
    }
}

/// Mock processing service for testing.
#[derive(Debug, Clone)]
pub struct MockProcessingService {
    response: std::result::Result<String, String>,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<ProcessingRequest>>>,
}

impl MockProcessingService {
    /// Succeed with `url` for every request.
    pub fn new(url: &str) -> Self {
        Self {
            response: Ok(url.to_string()),
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every request with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            ..Self::new("")
        }
    }

    /// Wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ProcessingRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ProcessingService for MockProcessingService {
    async fn process(&self, request: &ProcessingRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response
            .clone()
            .map_err(|message| LitlistenError::ProcessingFailure { message })
    }
}
