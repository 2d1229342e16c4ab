use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// External text-recognition collaborator. The relay never performs OCR
/// itself; it hands the image to this trait and gets raw multi-line text
/// back.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    text: String,
}

/// HTTP-backed recognizer posting the raw image to a configured endpoint.
/// The whole call is bounded by the configured timeout; a timeout or
/// transport error surfaces as a retryable upstream failure.
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRecognizer {
    pub fn new(endpoint: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Upstream("recognizer timed out".to_string())
                } else {
                    RelayError::Upstream(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Upstream(format!(
                "recognizer returned status {}",
                status.as_u16()
            )));
        }

        let body: RecognizeResponse = resp
            .json()
            .await
            .map_err(|e| RelayError::Upstream(format!("invalid recognizer response: {e}")))?;
        debug!(text_len = body.text.len(), "recognizer returned text");
        Ok(body.text)
    }
}
