//! Repository for the `accounts` table.

use pictor_core::ledger::Direction;
use pictor_core::types::DbId;
use sqlx::PgPool;

use crate::models::account::{Account, CreateAccount};
use crate::repositories::ledger_repo::{LedgerError, LedgerRepo};

/// Column list for `accounts` queries.
const COLUMNS: &str = "id, email, balance, created_at, updated_at";

/// Description on the credit entry recording an account's opening balance.
const OPENING_BALANCE_DESCRIPTION: &str = "Opening balance";

/// Provides account creation and lookups. Balance changes go through
/// [`LedgerRepo`].
pub struct AccountRepo;

impl AccountRepo {
    /// Create an account. A positive initial balance is applied as a
    /// credit entry in the same transaction.
    pub async fn create(pool: &PgPool, input: &CreateAccount) -> Result<Account, LedgerError> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO accounts (email) VALUES ($1) RETURNING {COLUMNS}"
        );
        let mut account = sqlx::query_as::<_, Account>(&query)
            .bind(input.email.trim())
            .fetch_one(&mut *tx)
            .await?;

        match input.initial_balance {
            Some(amount) if amount > 0 => {
                let outcome = LedgerRepo::apply_in_tx(
                    &mut tx,
                    account.id,
                    amount,
                    Direction::Credit,
                    Some(OPENING_BALANCE_DESCRIPTION),
                )
                .await?;
                account.balance = outcome.new_balance;
            }
            Some(amount) if amount < 0 => return Err(LedgerError::InvalidAmount(amount)),
            _ => {}
        }

        tx.commit().await?;
        Ok(account)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE email = $1");
        sqlx::query_as::<_, Account>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Current balance, or `None` for an unknown account.
    pub async fn balance(pool: &PgPool, id: DbId) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
