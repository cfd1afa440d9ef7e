//! Account entity and DTOs.

use pictor_core::types::{Credits, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `accounts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub id: DbId,
    pub email: String,
    pub balance: Credits,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an account. A positive `initial_balance` is recorded
/// as a credit entry so the ledger sums to the stored balance.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccount {
    pub email: String,
    pub initial_balance: Option<Credits>,
}
