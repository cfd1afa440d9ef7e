//! Repository for account balances and the `ledger_entries` table.
//!
//! Every balance change goes through [`LedgerRepo::apply_in_tx`], which
//! locks the account row (`SELECT ... FOR NO KEY UPDATE`), validates the
//! new balance, updates it and appends exactly one ledger entry. Concurrent
//! mutations on the same account are serialised by the row lock.
//!
//! The lock is `NO KEY UPDATE` rather than `UPDATE`: foreign-key checks on
//! rows referencing the account (predictions, ledger entries) hold
//! `KEY SHARE` on it, and `FOR UPDATE` would conflict with those and
//! deadlock callers that insert a child row before mutating the balance.

use pictor_core::error::CoreError;
use pictor_core::ledger::{self, Direction};
use pictor_core::types::{Credits, DbId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::ledger_entry::{LedgerAudit, LedgerEntry, LedgerMutation};

/// Column list for `ledger_entries` queries.
const COLUMNS: &str = "id, account_id, amount, direction, description, created_at, updated_at";

/// Failure modes of a balance mutation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Account {0} not found")]
    AccountNotFound(DbId),

    #[error("Ledger amount must be positive, got {0}")]
    InvalidAmount(Credits),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Credits, requested: Credits },

    #[error("Crediting {amount} would overflow balance {balance}")]
    BalanceOverflow { balance: Credits, amount: Credits },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<LedgerError> for CoreError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(id) => CoreError::not_found("Account", id),
            LedgerError::InvalidAmount(amount) => {
                CoreError::Validation(format!("Ledger amount must be positive, got {amount}"))
            }
            LedgerError::InsufficientFunds { balance, requested } => CoreError::InsufficientFunds {
                balance,
                required: requested,
            },
            err @ LedgerError::BalanceOverflow { .. } => CoreError::Validation(err.to_string()),
            LedgerError::Database(e) => CoreError::Internal(e.to_string()),
        }
    }
}

/// Balance mutations and ledger queries.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Apply a mutation in its own transaction.
    pub async fn apply_mutation(
        pool: &PgPool,
        account_id: DbId,
        amount: Credits,
        direction: Direction,
        description: Option<&str>,
    ) -> Result<LedgerMutation, LedgerError> {
        let mut tx = pool.begin().await?;
        let outcome = Self::apply_in_tx(&mut tx, account_id, amount, direction, description).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Apply a mutation inside the caller's transaction.
    ///
    /// On error nothing has been written by this call, but the caller owns
    /// the transaction and must roll it back to discard its own writes.
    pub async fn apply_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        account_id: DbId,
        amount: Credits,
        direction: Direction,
        description: Option<&str>,
    ) -> Result<LedgerMutation, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let balance: Option<Credits> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1 FOR NO KEY UPDATE")
                .bind(account_id)
                .fetch_optional(&mut **tx)
                .await?;
        let balance = balance.ok_or(LedgerError::AccountNotFound(account_id))?;

        let new_balance = ledger::next_balance(balance, amount, direction).map_err(|e| match e {
            CoreError::InsufficientFunds { balance, required } => LedgerError::InsufficientFunds {
                balance,
                requested: required,
            },
            _ => LedgerError::BalanceOverflow { balance, amount },
        })?;

        sqlx::query("UPDATE accounts SET balance = $2 WHERE id = $1")
            .bind(account_id)
            .bind(new_balance)
            .execute(&mut **tx)
            .await?;

        let entry_id: DbId = sqlx::query_scalar(
            "INSERT INTO ledger_entries (account_id, amount, direction, description) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(account_id)
        .bind(amount)
        .bind(direction.as_str())
        .bind(description)
        .fetch_one(&mut **tx)
        .await?;

        tracing::debug!(
            account_id,
            amount,
            direction = %direction,
            new_balance,
            entry_id,
            "Ledger mutation applied",
        );

        Ok(LedgerMutation {
            entry_id,
            new_balance,
        })
    }

    /// Administrative credit (top-up, refund).
    pub async fn credit(
        pool: &PgPool,
        account_id: DbId,
        amount: Credits,
        description: Option<&str>,
    ) -> Result<LedgerMutation, LedgerError> {
        Self::apply_mutation(pool, account_id, amount, Direction::Credit, description).await
    }

    /// Standalone debit, rejected when the balance does not cover it.
    pub async fn debit(
        pool: &PgPool,
        account_id: DbId,
        amount: Credits,
        description: Option<&str>,
    ) -> Result<LedgerMutation, LedgerError> {
        Self::apply_mutation(pool, account_id, amount, Direction::Debit, description).await
    }

    /// Entries for one account, newest first.
    pub async fn list_entries(
        pool: &PgPool,
        account_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ledger_entries \
             WHERE account_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(account_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Compare the stored balance with the signed sum of the ledger.
    /// Returns `None` when the account does not exist.
    pub async fn audit_balance(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Option<LedgerAudit>, sqlx::Error> {
        sqlx::query_as::<_, LedgerAudit>(
            "SELECT a.id AS account_id, a.balance, \
                    COALESCE(SUM( \
                        CASE WHEN e.direction = 'credit' THEN e.amount ELSE -e.amount END \
                    ), 0)::BIGINT AS ledger_sum \
             FROM accounts a \
             LEFT JOIN ledger_entries e ON e.account_id = a.id \
             WHERE a.id = $1 \
             GROUP BY a.id, a.balance",
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await
    }
}
