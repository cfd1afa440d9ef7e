//! Job submission: validate, price and enqueue.
//!
//! The balance check here is an optimisation only. Nothing is reserved, so
//! concurrent submissions can each pass it; the debit in the persistence
//! stage is authoritative.

use pictor_core::jobs::{normalize_prompt, GenerationJob};
use pictor_core::model_config::ModelType;
use pictor_core::naming::new_job_token;
use pictor_core::types::{Credits, DbId};
use pictor_db::models::model_config::ModelConfig;
use pictor_db::repositories::{AccountRepo, ModelConfigRepo};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::PipelineError;
use crate::queue::{enqueue_generation, JobQueue};

/// Informational message returned with every accepted submission.
pub const ACCEPTED_MESSAGE: &str =
    "Prediction task enqueued. Result will appear in your predictions history after processing is finished.";

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub prompt: String,
    /// Explicit image-generation model. `None` (or a non-positive id)
    /// selects the lowest-id active one.
    pub model_id: Option<DbId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    pub job_token: String,
    pub cost: Credits,
    pub message: String,
}

/// Resolve the model a submission runs against.
pub async fn resolve_model(
    pool: &PgPool,
    model_id: Option<DbId>,
) -> Result<ModelConfig, PipelineError> {
    let Some(id) = model_id.filter(|id| *id > 0) else {
        return ModelConfigRepo::first_active(pool, ModelType::ImageGeneration)
            .await?
            .ok_or(PipelineError::NoActiveModel);
    };

    let model = ModelConfigRepo::find_by_id(pool, id)
        .await?
        .ok_or(PipelineError::ModelNotFound(id))?;
    if model.kind()? != ModelType::ImageGeneration {
        return Err(PipelineError::ModelWrongType(id));
    }
    if !model.is_active {
        return Err(PipelineError::ModelInactive(id));
    }
    Ok(model)
}

/// Accept a generation request for `account_id` and enqueue it.
///
/// Writes nothing to the prediction catalog; the record only appears once
/// the persistence stage completes.
pub async fn submit_generation_job(
    pool: &PgPool,
    queue: &dyn JobQueue,
    account_id: DbId,
    request: &SubmitRequest,
) -> Result<SubmitReceipt, PipelineError> {
    if request.prompt.trim().is_empty() {
        return Err(PipelineError::EmptyPrompt);
    }
    let prompt = normalize_prompt(&request.prompt)?;

    let model = resolve_model(pool, request.model_id).await?;
    let cost = model.cost_credits;

    let balance = AccountRepo::balance(pool, account_id)
        .await?
        .ok_or(PipelineError::AccountNotFound(account_id))?;
    if balance < cost {
        return Err(PipelineError::InsufficientFunds {
            balance,
            required: cost,
        });
    }

    let job = GenerationJob {
        account_id,
        prompt,
        cost,
        job_token: new_job_token(),
    };
    enqueue_generation(queue, &job).await?;

    tracing::info!(
        account_id,
        job_token = %job.job_token,
        model = %model.name,
        cost,
        "Generation job submitted",
    );

    Ok(SubmitReceipt {
        job_token: job.job_token,
        cost,
        message: ACCEPTED_MESSAGE.to_string(),
    })
}
