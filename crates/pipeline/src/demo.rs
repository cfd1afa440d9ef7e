//! Demo predictions: public preview by token and zero-cost cloning into a
//! real account.
//!
//! The demo account is identified by `DEMO_ACCOUNT_EMAIL`. With no demo
//! account configured (or not yet registered) every demo lookup is a
//! plain not-found.

use pictor_core::naming::{clone_storage_key, new_job_token};
use pictor_core::storage::BlobStore;
use pictor_core::types::DbId;
use pictor_db::models::prediction::{CreatePrediction, Prediction};
use pictor_db::models::status::PredictionStatus;
use pictor_db::repositories::{AccountRepo, PredictionRepo};
use sqlx::PgPool;

use crate::error::PipelineError;

const DEMO_PREDICTION: &str = "Demo prediction";

/// Resolve the demo account id, if one is configured and registered.
pub async fn demo_account_id(
    pool: &PgPool,
    demo_email: Option<&str>,
) -> Result<Option<DbId>, PipelineError> {
    let Some(email) = demo_email else {
        return Ok(None);
    };
    Ok(AccountRepo::find_by_email(pool, email).await?.map(|a| a.id))
}

/// Fetch a prediction by job token, only if the demo account owns it.
pub async fn get_demo_by_token(
    pool: &PgPool,
    demo_email: Option<&str>,
    job_token: &str,
) -> Result<Prediction, PipelineError> {
    let demo_id = demo_account_id(pool, demo_email)
        .await?
        .ok_or(PipelineError::NotFound(DEMO_PREDICTION))?;
    PredictionRepo::find_by_token_for_account(pool, job_token, demo_id)
        .await?
        .ok_or(PipelineError::NotFound(DEMO_PREDICTION))
}

/// Copy a demo prediction into `target_account_id` at no charge.
///
/// Each call copies the blob to a fresh key under the target account and
/// inserts an independent record with a fresh token. The source record and
/// blob are untouched, and the ledger is not involved.
pub async fn clone_for_account(
    pool: &PgPool,
    store: &dyn BlobStore,
    demo_email: Option<&str>,
    source_token: &str,
    target_account_id: DbId,
) -> Result<Prediction, PipelineError> {
    let source = get_demo_by_token(pool, demo_email, source_token).await?;

    if AccountRepo::find_by_id(pool, target_account_id).await?.is_none() {
        return Err(PipelineError::AccountNotFound(target_account_id));
    }

    let storage_key = clone_storage_key(&source.storage_key, target_account_id);
    store.copy(&source.storage_key, &storage_key).await?;

    let input = CreatePrediction {
        account_id: target_account_id,
        source_prompt: source.source_prompt.clone(),
        translated_prompt: source.translated_prompt.clone(),
        public_url: store.public_url(&storage_key),
        storage_key,
        credits_charged: 0,
        status: PredictionStatus::Success,
        job_token: Some(new_job_token()),
    };

    let clone = match PredictionRepo::create(pool, &input).await {
        Ok(clone) => clone,
        Err(e) => {
            tracing::warn!(
                storage_key = %input.storage_key,
                error = %e,
                "Clone record insert failed; copied object is orphaned",
            );
            return Err(e.into());
        }
    };

    tracing::info!(
        source_prediction_id = source.id,
        prediction_id = clone.id,
        account_id = target_account_id,
        storage_key = %clone.storage_key,
        "Demo prediction cloned",
    );
    Ok(clone)
}
