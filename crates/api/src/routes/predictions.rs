//! Route definitions for the `/predictions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::predictions;
use crate::state::AppState;

/// Routes mounted at `/predictions`.
///
/// ```text
/// GET    /                  -> list_predictions
/// POST   /                  -> submit_prediction
/// GET    /{id}              -> get_prediction
/// GET    /{id}/image        -> prediction_image
/// GET    /demo/{token}      -> get_demo_prediction (public)
/// POST   /demo/claim        -> claim_demo_prediction
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(predictions::list_predictions).post(predictions::submit_prediction),
        )
        .route("/demo/claim", post(predictions::claim_demo_prediction))
        .route("/demo/{token}", get(predictions::get_demo_prediction))
        .route("/{id}", get(predictions::get_prediction))
        .route("/{id}/image", get(predictions::prediction_image))
}
