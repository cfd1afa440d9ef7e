//! Handlers for the `/predictions` resource.
//!
//! Submission only enqueues; the record appears in the caller's history
//! once the pipeline has charged and stored it. Everything except the demo
//! preview requires authentication.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use pictor_core::types::DbId;
use pictor_db::models::prediction::PredictionListQuery;
use pictor_pipeline::submit::{submit_generation_job, SubmitRequest};
use pictor_pipeline::{catalog, demo};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/predictions
///
/// Validate, price and enqueue a generation job. Returns 202 with the job
/// token and the cost that will be charged on completion.
pub async fn submit_prediction(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitRequest>,
) -> AppResult<impl IntoResponse> {
    let receipt =
        submit_generation_job(&state.pool, state.queue.as_ref(), auth.account_id, &input).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: receipt })))
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// GET /api/v1/predictions?limit=&offset=
pub async fn list_predictions(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PredictionListQuery>,
) -> AppResult<impl IntoResponse> {
    let items = catalog::list_for_account(&state.pool, auth.account_id, &params).await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /api/v1/predictions/{id}
pub async fn get_prediction(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(prediction_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let prediction = catalog::get_for_account(&state.pool, auth.account_id, prediction_id).await?;
    Ok(Json(DataResponse { data: prediction }))
}

/// GET /api/v1/predictions/{id}/image
///
/// 307 redirect to a presigned URL; the bucket itself stays private.
pub async fn prediction_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(prediction_id): Path<DbId>,
) -> AppResult<Redirect> {
    let url = catalog::image_url(
        &state.pool,
        state.store.as_ref(),
        auth.account_id,
        prediction_id,
        state.presign_ttl,
    )
    .await?;
    Ok(Redirect::temporary(&url))
}

// ---------------------------------------------------------------------------
// Demo
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ClaimDemoRequest {
    pub job_token: String,
}

/// GET /api/v1/predictions/demo/{token}
///
/// Public. Only predictions owned by the demo account are visible.
pub async fn get_demo_prediction(
    State(state): State<AppState>,
    Path(job_token): Path<String>,
) -> AppResult<impl IntoResponse> {
    let prediction = demo::get_demo_by_token(&state.pool, state.demo_email(), &job_token).await?;
    Ok(Json(DataResponse { data: prediction }))
}

/// POST /api/v1/predictions/demo/claim
///
/// Copy a demo prediction into the caller's history at no charge. Each
/// call creates a new, independent record.
pub async fn claim_demo_prediction(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ClaimDemoRequest>,
) -> AppResult<impl IntoResponse> {
    let clone = demo::clone_for_account(
        &state.pool,
        state.store.as_ref(),
        state.demo_email(),
        &input.job_token,
        auth.account_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: clone })))
}
