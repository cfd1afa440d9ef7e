//! Repository for the `identity_links` table.

use pictor_core::types::DbId;
use sqlx::PgPool;

use crate::models::identity_link::IdentityLink;

/// Column list for `identity_links` queries.
const COLUMNS: &str = "id, provider, external_id, account_id, created_at, updated_at";

/// Maps `(provider, external_id)` pairs to accounts.
pub struct IdentityLinkRepo;

impl IdentityLinkRepo {
    /// Link an external identity to an account, re-pointing an existing
    /// link for the same pair.
    pub async fn link(
        pool: &PgPool,
        provider: &str,
        external_id: &str,
        account_id: DbId,
    ) -> Result<IdentityLink, sqlx::Error> {
        let query = format!(
            "INSERT INTO identity_links (provider, external_id, account_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (provider, external_id) DO UPDATE SET account_id = EXCLUDED.account_id \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IdentityLink>(&query)
            .bind(provider)
            .bind(external_id)
            .bind(account_id)
            .fetch_one(pool)
            .await
    }

    /// Resolve an external identity to its account id.
    pub async fn resolve(
        pool: &PgPool,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT account_id FROM identity_links WHERE provider = $1 AND external_id = $2",
        )
        .bind(provider)
        .bind(external_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_account(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Vec<IdentityLink>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM identity_links WHERE account_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, IdentityLink>(&query)
            .bind(account_id)
            .fetch_all(pool)
            .await
    }

    /// Remove a link. Returns `true` if a row was deleted.
    pub async fn unlink(
        pool: &PgPool,
        provider: &str,
        external_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM identity_links WHERE provider = $1 AND external_id = $2",
        )
        .bind(provider)
        .bind(external_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
