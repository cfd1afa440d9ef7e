//! Model catalog rules: model types, field validation and the default seed
//! set registered at startup.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Credits;

/// Database value for translation models.
pub const MODEL_TYPE_TRANSLATION: &str = "translation";
/// Database value for image-generation models.
pub const MODEL_TYPE_IMAGE_GENERATION: &str = "image_generation";

/// Kind of work a configured model performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Translation,
    ImageGeneration,
}

impl ModelType {
    /// Database `model_type` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Translation => MODEL_TYPE_TRANSLATION,
            Self::ImageGeneration => MODEL_TYPE_IMAGE_GENERATION,
        }
    }

    /// Parse from the database `model_type` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            MODEL_TYPE_TRANSLATION => Ok(Self::Translation),
            MODEL_TYPE_IMAGE_GENERATION => Ok(Self::ImageGeneration),
            other => Err(CoreError::Validation(format!(
                "Unknown model type '{other}'. Must be one of: \
                 {MODEL_TYPE_TRANSLATION}, {MODEL_TYPE_IMAGE_GENERATION}"
            ))),
        }
    }
}

/// Validate the user-editable fields of a model configuration.
///
/// Names and engine are compared after trimming; cost may be zero.
pub fn validate_model_fields(
    name: &str,
    display_name: &str,
    engine: &str,
    cost_credits: Credits,
) -> Result<(), CoreError> {
    for (field, value) in [("name", name), ("display_name", display_name), ("engine", engine)] {
        if value.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Model field '{field}' must not be empty"
            )));
        }
    }
    validate_cost(cost_credits)
}

/// Reject negative model costs.
pub fn validate_cost(cost_credits: Credits) -> Result<(), CoreError> {
    if cost_credits < 0 {
        return Err(CoreError::Validation(format!(
            "Model cost must be >= 0, got {cost_credits}"
        )));
    }
    Ok(())
}

/// A model registered at startup when absent.
#[derive(Debug, Clone, Copy)]
pub struct DefaultModel {
    pub name: &'static str,
    pub display_name: &'static str,
    pub model_type: ModelType,
    pub engine: &'static str,
    pub version: Option<&'static str>,
    pub cost_credits: Credits,
}

/// Seed set: one translation model and one image-generation model.
pub const DEFAULT_MODELS: &[DefaultModel] = &[
    DefaultModel {
        name: "Helsinki-NLP/opus-mt-ru-en",
        display_name: "Opus MT ru-en",
        model_type: ModelType::Translation,
        engine: "huggingface",
        version: None,
        cost_credits: 0,
    },
    DefaultModel {
        name: "dreamshaper_v8",
        display_name: "DreamShaper v8",
        model_type: ModelType::ImageGeneration,
        engine: "diffusers",
        version: Some("8"),
        cost_credits: 10,
    },
];
