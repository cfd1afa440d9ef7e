//! Model catalog entity and DTOs.

use pictor_core::error::CoreError;
use pictor_core::model_config::ModelType;
use pictor_core::types::{Credits, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `model_configs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModelConfig {
    pub id: DbId,
    pub name: String,
    pub display_name: String,
    pub model_type: String,
    pub engine: String,
    pub version: Option<String>,
    pub cost_credits: Credits,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ModelConfig {
    pub fn kind(&self) -> Result<ModelType, CoreError> {
        ModelType::from_name(&self.model_type)
    }
}

/// DTO for registering a model.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateModelConfig {
    pub name: String,
    pub display_name: String,
    pub model_type: String,
    pub engine: String,
    pub version: Option<String>,
    pub cost_credits: Credits,
    pub is_active: Option<bool>,
}
