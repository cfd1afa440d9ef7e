//! Read-only view of the model catalog, so callers can pick a `model_id`.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use pictor_core::model_config::ModelType;
use pictor_db::repositories::ModelConfigRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/models
///
/// Active image-generation models with their per-generation cost.
pub async fn list_image_models(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let models = ModelConfigRepo::list(&state.pool, Some(ModelType::ImageGeneration), true).await?;
    Ok(Json(DataResponse { data: models }))
}
