//! Route definitions for the caller's `/account`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::account;
use crate::state::AppState;

/// Routes mounted at `/account`.
///
/// ```text
/// GET    /balance            -> get_balance
/// POST   /balance/deposit    -> deposit
/// GET    /transactions       -> list_transactions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(account::get_balance))
        .route("/balance/deposit", post(account::deposit))
        .route("/transactions", get(account::list_transactions))
}
