//! Handlers for the caller's own account: balance, top-up and ledger.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use pictor_core::error::CoreError;
use pictor_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use pictor_core::types::{Credits, DbId};
use pictor_db::repositories::{AccountRepo, LedgerRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Balance top-up";

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_id: DbId,
    pub balance: Credits,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Credits,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LedgerListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/account/balance
pub async fn get_balance(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let balance = AccountRepo::balance(&state.pool, auth.account_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Account", auth.account_id)))?;
    Ok(Json(DataResponse {
        data: BalanceResponse {
            account_id: auth.account_id,
            balance,
        },
    }))
}

/// POST /api/v1/account/balance/deposit
///
/// Credit the caller's balance. The amount must be positive.
pub async fn deposit(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<DepositRequest>,
) -> AppResult<impl IntoResponse> {
    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DEPOSIT_DESCRIPTION);

    let mutation =
        LedgerRepo::credit(&state.pool, auth.account_id, input.amount, Some(description)).await?;

    tracing::info!(
        account_id = auth.account_id,
        amount = input.amount,
        entry_id = mutation.entry_id,
        "Balance topped up",
    );

    Ok(Json(DataResponse {
        data: BalanceResponse {
            account_id: auth.account_id,
            balance: mutation.new_balance,
        },
    }))
}

/// GET /api/v1/account/transactions?limit=&offset=
///
/// Ledger entries, newest first.
pub async fn list_transactions(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LedgerListQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);
    let entries = LedgerRepo::list_entries(&state.pool, auth.account_id, limit, offset).await?;
    Ok(Json(DataResponse { data: entries }))
}
