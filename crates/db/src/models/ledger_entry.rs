//! Ledger entry entity and mutation results.

use pictor_core::error::CoreError;
use pictor_core::ledger::Direction;
use pictor_core::types::{Credits, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the append-only `ledger_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: DbId,
    pub account_id: DbId,
    pub amount: Credits,
    pub direction: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LedgerEntry {
    pub fn direction(&self) -> Result<Direction, CoreError> {
        Direction::from_name(&self.direction)
    }

    /// Signed effect of this entry on the balance.
    pub fn signed_amount(&self) -> Result<Credits, CoreError> {
        Ok(self.direction()?.signed(self.amount))
    }
}

/// Outcome of a successful balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerMutation {
    pub entry_id: DbId,
    pub new_balance: Credits,
}

/// Stored balance next to the sum of the account's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct LedgerAudit {
    pub account_id: DbId,
    pub balance: Credits,
    pub ledger_sum: Credits,
}

impl LedgerAudit {
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_sum
    }
}
