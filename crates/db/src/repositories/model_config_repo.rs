//! Repository for the `model_configs` table.

use pictor_core::model_config::{ModelType, DEFAULT_MODELS};
use pictor_core::types::{Credits, DbId};
use sqlx::PgPool;

use crate::models::model_config::{CreateModelConfig, ModelConfig};

/// Column list for `model_configs` queries.
const COLUMNS: &str = "\
    id, name, display_name, model_type, engine, version, \
    cost_credits, is_active, created_at, updated_at";

/// Provides CRUD operations for the model catalog.
pub struct ModelConfigRepo;

impl ModelConfigRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateModelConfig,
    ) -> Result<ModelConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO model_configs \
                 (name, display_name, model_type, engine, version, cost_credits, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelConfig>(&query)
            .bind(&input.name)
            .bind(&input.display_name)
            .bind(&input.model_type)
            .bind(&input.engine)
            .bind(&input.version)
            .bind(input.cost_credits)
            .bind(input.is_active.unwrap_or(true))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ModelConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM model_configs WHERE id = $1");
        sqlx::query_as::<_, ModelConfig>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<ModelConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM model_configs WHERE name = $1");
        sqlx::query_as::<_, ModelConfig>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List models, optionally restricted to one type and/or active rows.
    pub async fn list(
        pool: &PgPool,
        model_type: Option<ModelType>,
        active_only: bool,
    ) -> Result<Vec<ModelConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM model_configs \
             WHERE ($1::TEXT IS NULL OR model_type = $1) \
               AND (NOT $2 OR is_active) \
             ORDER BY id"
        );
        sqlx::query_as::<_, ModelConfig>(&query)
            .bind(model_type.map(ModelType::as_str))
            .bind(active_only)
            .fetch_all(pool)
            .await
    }

    /// The lowest-id active model of the given type.
    pub async fn first_active(
        pool: &PgPool,
        model_type: ModelType,
    ) -> Result<Option<ModelConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM model_configs \
             WHERE model_type = $1 AND is_active \
             ORDER BY id \
             LIMIT 1"
        );
        sqlx::query_as::<_, ModelConfig>(&query)
            .bind(model_type.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        is_active: bool,
    ) -> Result<Option<ModelConfig>, sqlx::Error> {
        let query = format!(
            "UPDATE model_configs SET is_active = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelConfig>(&query)
            .bind(id)
            .bind(is_active)
            .fetch_optional(pool)
            .await
    }

    /// Change the per-generation price. Jobs already queued keep the cost
    /// they were submitted with.
    pub async fn update_cost(
        pool: &PgPool,
        id: DbId,
        cost_credits: Credits,
    ) -> Result<Option<ModelConfig>, sqlx::Error> {
        let query = format!(
            "UPDATE model_configs SET cost_credits = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ModelConfig>(&query)
            .bind(id)
            .bind(cost_credits)
            .fetch_optional(pool)
            .await
    }

    /// Insert the default models that are not registered yet. Existing
    /// rows are left untouched. Returns the number of rows inserted.
    pub async fn seed_defaults(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for model in DEFAULT_MODELS {
            let result = sqlx::query(
                "INSERT INTO model_configs \
                     (name, display_name, model_type, engine, version, cost_credits) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (name) DO NOTHING",
            )
            .bind(model.name)
            .bind(model.display_name)
            .bind(model.model_type.as_str())
            .bind(model.engine)
            .bind(model.version)
            .bind(model.cost_credits)
            .execute(pool)
            .await?;
            inserted += result.rows_affected();
        }
        if inserted > 0 {
            tracing::info!(inserted, "Seeded default models");
        }
        Ok(inserted)
    }
}
