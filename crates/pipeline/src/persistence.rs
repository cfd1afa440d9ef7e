//! Stage two: the idempotent debit + record step.
//!
//! The only writer of prediction rows for generated images and the only
//! place a generation is charged. Redelivery of the same job token yields
//! the existing record and no second debit.

use async_trait::async_trait;
use pictor_core::jobs::PersistenceJob;
use pictor_core::ledger::{generation_debit_description, Direction};
use pictor_db::models::prediction::{CreatePrediction, Prediction};
use pictor_db::models::status::PredictionStatus;
use pictor_db::repositories::{LedgerRepo, PredictionRepo};
use serde::Serialize;
use sqlx::PgPool;

use crate::consumer::JobHandler;
use crate::error::PipelineError;

#[derive(Debug, Clone, Serialize)]
pub struct PersistenceOutcome {
    pub prediction: Prediction,
    /// `true` when an earlier delivery already recorded this token.
    pub already_processed: bool,
}

/// Record the prediction and debit its cost in one transaction.
///
/// The insert runs before the debit: a concurrent delivery of the same
/// token blocks on the unique index until the first commits, then sees no
/// inserted row and returns the committed record. A debit failure rolls
/// the insert back, so there is never a record without its charge.
pub async fn persist_prediction(
    pool: &PgPool,
    job: &PersistenceJob,
) -> Result<PersistenceOutcome, PipelineError> {
    if job.cost < 0 {
        return Err(PipelineError::Validation(format!(
            "Job cost must be >= 0, got {}",
            job.cost
        )));
    }

    if let Some(existing) = PredictionRepo::find_by_token(pool, &job.job_token).await? {
        return already_processed(job, existing);
    }

    let mut tx = pool.begin().await?;

    let input = CreatePrediction {
        account_id: job.account_id,
        source_prompt: job.original_prompt.clone(),
        translated_prompt: Some(job.translated_prompt.clone()),
        storage_key: job.storage_key.clone(),
        public_url: job.public_url.clone(),
        credits_charged: job.cost,
        status: PredictionStatus::Success,
        job_token: Some(job.job_token.clone()),
    };

    let Some(prediction) = PredictionRepo::insert_if_absent(&mut tx, &input).await? else {
        tx.rollback().await?;
        let existing = PredictionRepo::find_by_token(pool, &job.job_token)
            .await?
            .ok_or_else(|| {
                PipelineError::Integrity(format!(
                    "job token {} conflicted but no record is visible",
                    job.job_token
                ))
            })?;
        return already_processed(job, existing);
    };

    // Ledger entries require a positive amount; free jobs leave no entry.
    if job.cost > 0 {
        let description = generation_debit_description(&job.job_token);
        LedgerRepo::apply_in_tx(
            &mut tx,
            job.account_id,
            job.cost,
            Direction::Debit,
            Some(&description),
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        account_id = job.account_id,
        job_token = %job.job_token,
        prediction_id = prediction.id,
        cost = job.cost,
        "Prediction recorded",
    );

    Ok(PersistenceOutcome {
        prediction,
        already_processed: false,
    })
}

fn already_processed(
    job: &PersistenceJob,
    existing: Prediction,
) -> Result<PersistenceOutcome, PipelineError> {
    if existing.account_id != job.account_id {
        return Err(PipelineError::Integrity(format!(
            "job token {} is recorded for account {}, not {}",
            job.job_token, existing.account_id, job.account_id
        )));
    }
    tracing::info!(
        job_token = %job.job_token,
        prediction_id = existing.id,
        "Duplicate persistence delivery; returning existing record",
    );
    Ok(PersistenceOutcome {
        prediction: existing,
        already_processed: true,
    })
}

/// Queue handler for the persistence stage.
#[derive(Debug, Clone)]
pub struct PersistenceWorker {
    pool: PgPool,
}

impl PersistenceWorker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn process(&self, job: &PersistenceJob) -> Result<PersistenceOutcome, PipelineError> {
        persist_prediction(&self.pool, job).await
    }
}

#[async_trait]
impl JobHandler for PersistenceWorker {
    async fn handle(&self, payload: serde_json::Value) -> Result<(), PipelineError> {
        let job: PersistenceJob = serde_json::from_value(payload)?;
        match self.process(&job).await {
            Ok(_) => Ok(()),
            Err(e @ PipelineError::InsufficientFunds { .. }) => {
                tracing::warn!(
                    account_id = job.account_id,
                    job_token = %job.job_token,
                    cost = job.cost,
                    error = %e,
                    "Balance no longer covers the job; nothing recorded or charged",
                );
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
