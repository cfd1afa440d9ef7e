//! Thin REST client for the inference server.
//!
//! Endpoints:
//! - `POST /translate` `{ "model", "text" }` -> `{ "text" }`
//! - `POST /generate` `{ "model", "prompt" }` -> raw image bytes

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors from the inference REST layer.
#[derive(Debug, thiserror::Error)]
pub enum InferenceApiError {
    /// Network, DNS, TLS or timeout failure.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Inference API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    model: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// HTTP client for one inference server.
#[derive(Debug, Clone)]
pub struct InferenceApi {
    client: reqwest::Client,
    base_url: String,
}

impl InferenceApi {
    /// Build a client whose requests time out after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InferenceApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn translate(&self, model: &str, text: &str) -> Result<String, InferenceApiError> {
        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&TranslateRequest { model, text })
            .send()
            .await?;
        let body: TranslateResponse = Self::ensure_success(response).await?.json().await?;
        Ok(body.text)
    }

    pub async fn generate(&self, model: &str, prompt: &str) -> Result<Vec<u8>, InferenceApiError> {
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&GenerateRequest { model, prompt })
            .send()
            .await?;
        let bytes = Self::ensure_success(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, InferenceApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
        Err(InferenceApiError::ApiError {
            status: status.as_u16(),
            body,
        })
    }
}
