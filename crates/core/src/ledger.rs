//! Ledger direction and amount rules.
//!
//! Every balance change is an `(amount, direction)` pair with a strictly
//! positive amount. The sign comes from the direction only. The database
//! layer applies these rules inside the same transaction that locks the
//! account row.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Credits;

/// Database value for credit entries.
pub const DIRECTION_CREDIT: &str = "credit";
/// Database value for debit entries.
pub const DIRECTION_DEBIT: &str = "debit";

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    /// Database `direction` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => DIRECTION_CREDIT,
            Self::Debit => DIRECTION_DEBIT,
        }
    }

    /// Parse from the database `direction` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            DIRECTION_CREDIT => Ok(Self::Credit),
            DIRECTION_DEBIT => Ok(Self::Debit),
            other => Err(CoreError::Validation(format!(
                "Unknown ledger direction '{other}'"
            ))),
        }
    }

    /// Signed effect of `amount` credits in this direction.
    pub fn signed(self, amount: Credits) -> Credits {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject zero or negative mutation amounts.
pub fn validate_amount(amount: Credits) -> Result<(), CoreError> {
    if amount > 0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Ledger amount must be positive, got {amount}"
        )))
    }
}

/// Compute the balance after applying `amount` in `direction`.
///
/// Fails with `InsufficientFunds` when a debit would drive the balance
/// below zero, and with `Validation` on a non-positive amount or overflow.
pub fn next_balance(
    balance: Credits,
    amount: Credits,
    direction: Direction,
) -> Result<Credits, CoreError> {
    validate_amount(amount)?;
    match direction {
        Direction::Credit => balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::Validation("Balance overflow".into())),
        Direction::Debit if balance < amount => Err(CoreError::InsufficientFunds {
            balance,
            required: amount,
        }),
        Direction::Debit => Ok(balance - amount),
    }
}

/// Description recorded on the debit for a generation job.
pub fn generation_debit_description(job_token: &str) -> String {
    format!("Image generation (job {job_token})")
}
