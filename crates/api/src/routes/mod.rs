pub mod account;
pub mod health;
pub mod models;
pub mod predictions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /predictions                         list, submit (requires auth)
/// /predictions/{id}                    get (requires auth)
/// /predictions/{id}/image              presigned redirect (requires auth)
/// /predictions/demo/{token}            demo preview (public)
/// /predictions/demo/claim              clone a demo prediction (requires auth)
///
/// /account/balance                     current balance
/// /account/balance/deposit             top-up (POST)
/// /account/transactions                ledger entries
///
/// /models                              active image models
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/predictions", predictions::router())
        .nest("/account", account::router())
        .nest("/models", models::router())
}
