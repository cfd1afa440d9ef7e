//! Enqueue side of the job queue.
//!
//! Producers (submission, the generation worker) only see [`JobQueue`].
//! Claiming and settlement live in [`crate::consumer`], which talks to the
//! `queue_jobs` table directly.

use std::sync::Mutex;

use async_trait::async_trait;
use pictor_core::jobs::{
    GenerationJob, PersistenceJob, GENERATION_QUEUE, GENERATION_ROUTING_KEY, PERSISTENCE_QUEUE,
    PERSISTENCE_ROUTING_KEY,
};
use pictor_db::repositories::QueueRepo;
use sqlx::PgPool;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Unknown queue '{0}'")]
    UnknownQueue(String),

    #[error("Queue storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Durably enqueue `payload`. With a `job_id`, a second enqueue of the
    /// same id on the same queue is a no-op that returns `false`.
    async fn enqueue(
        &self,
        queue_name: &str,
        routing_key: &str,
        payload: serde_json::Value,
        job_id: Option<&str>,
    ) -> Result<bool, QueueError>;
}

// ---------------------------------------------------------------------------
// Typed producers
// ---------------------------------------------------------------------------

/// Enqueue stage one, keyed by the job token.
pub async fn enqueue_generation(
    queue: &dyn JobQueue,
    job: &GenerationJob,
) -> Result<bool, PipelineError> {
    let payload = serde_json::to_value(job)?;
    Ok(queue
        .enqueue(GENERATION_QUEUE, GENERATION_ROUTING_KEY, payload, Some(&job.job_token))
        .await?)
}

/// Enqueue stage two, keyed by the same job token as stage one.
pub async fn enqueue_persistence(
    queue: &dyn JobQueue,
    job: &PersistenceJob,
) -> Result<bool, PipelineError> {
    let payload = serde_json::to_value(job)?;
    Ok(queue
        .enqueue(PERSISTENCE_QUEUE, PERSISTENCE_ROUTING_KEY, payload, Some(&job.job_token))
        .await?)
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// Queue backed by the `queue_jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    generation_max_attempts: i32,
    persistence_max_attempts: i32,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, config: &PipelineConfig) -> Self {
        Self {
            pool,
            generation_max_attempts: config.generation_max_attempts,
            persistence_max_attempts: config.persistence_max_attempts,
        }
    }

    fn max_attempts(&self, queue_name: &str) -> Result<i32, QueueError> {
        match queue_name {
            GENERATION_QUEUE => Ok(self.generation_max_attempts),
            PERSISTENCE_QUEUE => Ok(self.persistence_max_attempts),
            other => Err(QueueError::UnknownQueue(other.to_string())),
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(
        &self,
        queue_name: &str,
        routing_key: &str,
        payload: serde_json::Value,
        job_id: Option<&str>,
    ) -> Result<bool, QueueError> {
        let max_attempts = self.max_attempts(queue_name)?;
        let inserted = QueueRepo::enqueue(
            &self.pool,
            queue_name,
            routing_key,
            job_id,
            &payload,
            max_attempts,
        )
        .await?;

        match &inserted {
            Some(row) => tracing::debug!(
                queue = queue_name,
                routing_key,
                job_id,
                queue_job_id = row.id,
                "Job enqueued",
            ),
            None => tracing::info!(queue = queue_name, job_id, "Duplicate enqueue ignored"),
        }
        Ok(inserted.is_some())
    }
}

// ---------------------------------------------------------------------------
// In-process recorder
// ---------------------------------------------------------------------------

/// A message captured by [`RecordingQueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedJob {
    pub queue_name: String,
    pub routing_key: String,
    pub payload: serde_json::Value,
    pub job_id: Option<String>,
}

/// Keeps enqueued messages in memory with the same de-duplication rule as
/// the database queue. Can be switched to fail every enqueue.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<RecordedJob>>,
    unavailable: Mutex<bool>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything enqueued so far.
    pub fn jobs(&self) -> Vec<RecordedJob> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }

    pub fn jobs_on(&self, queue_name: &str) -> Vec<RecordedJob> {
        self.jobs()
            .into_iter()
            .filter(|j| j.queue_name == queue_name)
            .collect()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.lock() {
            *flag = unavailable;
        }
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(
        &self,
        queue_name: &str,
        routing_key: &str,
        payload: serde_json::Value,
        job_id: Option<&str>,
    ) -> Result<bool, QueueError> {
        if self.unavailable.lock().map(|f| *f).unwrap_or(false) {
            return Err(QueueError::Unavailable("recording queue switched off".into()));
        }
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| QueueError::Unavailable("recording queue poisoned".into()))?;
        let duplicate = job_id.is_some()
            && jobs
                .iter()
                .any(|j| j.queue_name == queue_name && j.job_id.as_deref() == job_id);
        if duplicate {
            return Ok(false);
        }
        jobs.push(RecordedJob {
            queue_name: queue_name.to_string(),
            routing_key: routing_key.to_string(),
            payload,
            job_id: job_id.map(str::to_string),
        });
        Ok(true)
    }
}
