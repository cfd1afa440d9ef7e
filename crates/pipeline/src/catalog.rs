//! Read paths over the prediction catalog, plus model registration.

use std::time::Duration;

use pictor_core::model_config::{validate_model_fields, ModelType};
use pictor_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use pictor_core::storage::{BlobStore, StoredObject};
use pictor_core::types::DbId;
use pictor_db::models::model_config::{CreateModelConfig, ModelConfig};
use pictor_db::models::prediction::{Prediction, PredictionListQuery};
use pictor_db::repositories::{ModelConfigRepo, PredictionRepo};
use sqlx::PgPool;

use crate::error::PipelineError;

const PREDICTION: &str = "Prediction";

/// An account's predictions, newest first. Limit defaults to 50, capped
/// at 100.
pub async fn list_for_account(
    pool: &PgPool,
    account_id: DbId,
    query: &PredictionListQuery,
) -> Result<Vec<Prediction>, PipelineError> {
    let limit = clamp_limit(query.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(query.offset);
    Ok(PredictionRepo::list_by_account(pool, account_id, limit, offset).await?)
}

/// A prediction owned by `account_id`. Other accounts' rows are reported
/// as not found.
pub async fn get_for_account(
    pool: &PgPool,
    account_id: DbId,
    prediction_id: DbId,
) -> Result<Prediction, PipelineError> {
    PredictionRepo::find_for_account(pool, prediction_id, account_id)
        .await?
        .ok_or(PipelineError::NotFound(PREDICTION))
}

/// Time-limited URL for an owned prediction's image.
pub async fn image_url(
    pool: &PgPool,
    store: &dyn BlobStore,
    account_id: DbId,
    prediction_id: DbId,
    ttl: Duration,
) -> Result<String, PipelineError> {
    let prediction = get_for_account(pool, account_id, prediction_id).await?;
    Ok(store.presign_get(&prediction.storage_key, ttl).await?)
}

/// Image bytes, content type and length for an owned prediction.
pub async fn fetch_image(
    pool: &PgPool,
    store: &dyn BlobStore,
    account_id: DbId,
    prediction_id: DbId,
) -> Result<StoredObject, PipelineError> {
    let prediction = get_for_account(pool, account_id, prediction_id).await?;
    Ok(store.get(&prediction.storage_key).await?)
}

/// Validate and register a model.
pub async fn register_model(
    pool: &PgPool,
    input: &CreateModelConfig,
) -> Result<ModelConfig, PipelineError> {
    validate_model_fields(
        &input.name,
        &input.display_name,
        &input.engine,
        input.cost_credits,
    )?;
    ModelType::from_name(&input.model_type)?;

    let normalized = CreateModelConfig {
        name: input.name.trim().to_string(),
        display_name: input.display_name.trim().to_string(),
        engine: input.engine.trim().to_string(),
        ..input.clone()
    };
    Ok(ModelConfigRepo::create(pool, &normalized).await?)
}
