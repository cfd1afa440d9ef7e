//! Repository for the `predictions` table.

use pictor_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::prediction::{CreatePrediction, Prediction};

/// Column list for `predictions` queries.
const COLUMNS: &str = "\
    id, account_id, source_prompt, translated_prompt, storage_key, public_url, \
    credits_charged, status_id, job_token, created_at, updated_at";

/// Provides inserts and lookups for generated images.
pub struct PredictionRepo;

impl PredictionRepo {
    /// Insert a prediction row. Storage-key and token collisions surface
    /// as unique violations.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePrediction,
    ) -> Result<Prediction, sqlx::Error> {
        let query = format!(
            "INSERT INTO predictions \
                 (account_id, source_prompt, translated_prompt, storage_key, public_url, \
                  credits_charged, status_id, job_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prediction>(&query)
            .bind(input.account_id)
            .bind(&input.source_prompt)
            .bind(&input.translated_prompt)
            .bind(&input.storage_key)
            .bind(&input.public_url)
            .bind(input.credits_charged)
            .bind(input.status.id())
            .bind(&input.job_token)
            .fetch_one(pool)
            .await
    }

    /// Insert inside the caller's transaction unless a row with the same
    /// job token exists. Returns `None` when the token was already taken.
    ///
    /// A concurrent insert of the same token blocks on the unique index
    /// until the other transaction finishes, so exactly one caller gets
    /// `Some`.
    pub async fn insert_if_absent(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreatePrediction,
    ) -> Result<Option<Prediction>, sqlx::Error> {
        let query = format!(
            "INSERT INTO predictions \
                 (account_id, source_prompt, translated_prompt, storage_key, public_url, \
                  credits_charged, status_id, job_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (job_token) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prediction>(&query)
            .bind(input.account_id)
            .bind(&input.source_prompt)
            .bind(&input.translated_prompt)
            .bind(&input.storage_key)
            .bind(&input.public_url)
            .bind(input.credits_charged)
            .bind(input.status.id())
            .bind(&input.job_token)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Prediction>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM predictions WHERE id = $1");
        sqlx::query_as::<_, Prediction>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a prediction owned by `account_id`. Another account's row is
    /// indistinguishable from a missing one.
    pub async fn find_for_account(
        pool: &PgPool,
        id: DbId,
        account_id: DbId,
    ) -> Result<Option<Prediction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM predictions WHERE id = $1 AND account_id = $2"
        );
        sqlx::query_as::<_, Prediction>(&query)
            .bind(id)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_token(
        pool: &PgPool,
        job_token: &str,
    ) -> Result<Option<Prediction>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM predictions WHERE job_token = $1");
        sqlx::query_as::<_, Prediction>(&query)
            .bind(job_token)
            .fetch_optional(pool)
            .await
    }

    /// Find a prediction by token owned by `account_id`.
    pub async fn find_by_token_for_account(
        pool: &PgPool,
        job_token: &str,
        account_id: DbId,
    ) -> Result<Option<Prediction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM predictions WHERE job_token = $1 AND account_id = $2"
        );
        sqlx::query_as::<_, Prediction>(&query)
            .bind(job_token)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    /// Page through an account's predictions, newest first.
    pub async fn list_by_account(
        pool: &PgPool,
        account_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Prediction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM predictions \
             WHERE account_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Prediction>(&query)
            .bind(account_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_account(pool: &PgPool, account_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM predictions WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(pool)
            .await
    }
}
