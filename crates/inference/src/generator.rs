use async_trait::async_trait;
use pictor_core::inference::{GenerationError, ImageGenerator};

use crate::api::InferenceApi;

/// Generates images through the inference server.
#[derive(Debug, Clone)]
pub struct HttpImageGenerator {
    api: InferenceApi,
    model: String,
}

impl HttpImageGenerator {
    pub fn new(api: InferenceApi, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GenerationError> {
        let bytes = self
            .api
            .generate(&self.model, prompt)
            .await
            .map_err(|e| GenerationError(e.to_string()))?;
        tracing::debug!(model = %self.model, bytes = bytes.len(), "Image generated");
        Ok(bytes)
    }
}
