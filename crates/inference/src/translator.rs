use async_trait::async_trait;
use pictor_core::inference::{TranslationError, Translator};

use crate::api::InferenceApi;

/// Translates prompts through the inference server.
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    api: InferenceApi,
    model: String,
}

impl HttpTranslator {
    pub fn new(api: InferenceApi, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        let translated = self
            .api
            .translate(&self.model, text)
            .await
            .map_err(|e| TranslationError(e.to_string()))?;
        tracing::debug!(
            model = %self.model,
            chars = translated.chars().count(),
            "Prompt translated"
        );
        Ok(translated)
    }
}
