//! Queue consumer: polls one queue, runs jobs under time limits and
//! settles each delivery.
//!
//! Delivery is at-least-once. A job is acked only after its handler
//! succeeds; failures are retried with exponential backoff or
//! dead-lettered according to [`PipelineError::disposition`]. A crashed
//! worker's job is redelivered once its lease expires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pictor_core::jobs::{GENERATION_QUEUE, PERSISTENCE_QUEUE};
use pictor_db::models::queue_job::QueueJob;
use pictor_db::models::status::QueueJobStatus;
use pictor_db::repositories::QueueRepo;
use rand::Rng;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::{Disposition, PipelineError};

/// Extra lease time beyond the hard limit so a job that runs to its limit
/// is not redelivered while the first delivery is still settling.
const LEASE_MARGIN: Duration = Duration::from_secs(30);

/// Upper bound on a single retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(600);

/// Processes one decoded delivery.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, payload: serde_json::Value) -> Result<(), PipelineError>;
}

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Acked,
    Retried,
    DeadLettered,
}

#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub queue_name: &'static str,
    pub concurrency: usize,
    pub hard_limit: Duration,
    /// Warn once a job has run this long.
    pub soft_limit: Option<Duration>,
    pub poll_interval: Duration,
    pub retry_base_delay: Duration,
}

impl ConsumerSettings {
    pub fn generation(config: &PipelineConfig) -> Self {
        Self {
            queue_name: GENERATION_QUEUE,
            concurrency: config.generation_concurrency,
            hard_limit: config.generation_hard_limit,
            soft_limit: Some(config.generation_soft_limit),
            poll_interval: config.poll_interval,
            retry_base_delay: config.retry_base_delay,
        }
    }

    pub fn persistence(config: &PipelineConfig) -> Self {
        Self {
            queue_name: PERSISTENCE_QUEUE,
            concurrency: config.persistence_concurrency,
            hard_limit: config.persistence_hard_limit,
            soft_limit: None,
            poll_interval: config.poll_interval,
            retry_base_delay: config.retry_base_delay,
        }
    }

    fn lease(&self) -> Duration {
        self.hard_limit + LEASE_MARGIN
    }
}

/// Delay before the next attempt: `base * 2^(attempt-1)`, capped, plus up
/// to 25% random jitter.
pub fn retry_delay(base: Duration, attempt: i32) -> Duration {
    let exponent = attempt.saturating_sub(1).clamp(0, 16) as u32;
    let delay = base.saturating_mul(1 << exponent).min(MAX_RETRY_DELAY);
    let jitter_ms = (delay.as_millis() / 4) as u64;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_ms)
    };
    delay + Duration::from_millis(jitter)
}

/// Polls a queue and dispatches deliveries to a [`JobHandler`].
#[derive(Clone)]
pub struct QueueConsumer {
    pool: PgPool,
    handler: Arc<dyn JobHandler>,
    settings: ConsumerSettings,
    permits: Arc<Semaphore>,
}

impl QueueConsumer {
    pub fn new(pool: PgPool, handler: Arc<dyn JobHandler>, settings: ConsumerSettings) -> Self {
        let permits = Arc::new(Semaphore::new(settings.concurrency.max(1)));
        Self {
            pool,
            handler,
            settings,
            permits,
        }
    }

    /// Run until `cancel` fires, then wait for in-flight jobs to settle.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            queue = self.settings.queue_name,
            concurrency = self.settings.concurrency,
            hard_limit_secs = self.settings.hard_limit.as_secs(),
            "Queue consumer started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(
                        queue = self.settings.queue_name,
                        "Queue consumer shutting down"
                    );
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.poll().await {
                        tracing::error!(
                            queue = self.settings.queue_name,
                            error = %e,
                            "Poll cycle failed"
                        );
                    }
                }
            }
        }

        let total = self.settings.concurrency.max(1) as u32;
        if let Ok(all) = self.permits.acquire_many(total).await {
            drop(all);
        }
        tracing::info!(queue = self.settings.queue_name, "Queue consumer drained");
    }

    /// One poll cycle: reap exhausted leases, then claim and spawn jobs
    /// while permits are free. Returns the number of jobs started.
    async fn poll(&self) -> Result<usize, sqlx::Error> {
        let reaped = QueueRepo::reap_expired(&self.pool, self.settings.queue_name).await?;
        if reaped > 0 {
            tracing::error!(
                queue = self.settings.queue_name,
                reaped,
                "Dead-lettered jobs whose final attempt never settled",
            );
        }

        let mut started = 0;
        loop {
            let Ok(permit) = self.permits.clone().try_acquire_owned() else {
                break;
            };
            let Some(job) =
                QueueRepo::claim(&self.pool, self.settings.queue_name, self.settings.lease())
                    .await?
            else {
                break;
            };

            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.execute(job).await {
                    tracing::error!(
                        queue = this.settings.queue_name,
                        error = %e,
                        "Failed to settle job"
                    );
                }
                drop(permit);
            });
            started += 1;
        }
        Ok(started)
    }

    /// Claim and run a single job inline. Returns `None` when nothing is
    /// deliverable.
    pub async fn process_next(&self) -> Result<Option<JobOutcome>, sqlx::Error> {
        let claimed =
            QueueRepo::claim(&self.pool, self.settings.queue_name, self.settings.lease()).await?;
        match claimed {
            Some(job) => self.execute(job).await.map(Some),
            None => Ok(None),
        }
    }

    /// Run the handler under the time limits and settle the delivery.
    async fn execute(&self, job: QueueJob) -> Result<JobOutcome, sqlx::Error> {
        let started = Instant::now();
        tracing::debug!(
            queue = self.settings.queue_name,
            queue_job_id = job.id,
            job_id = job.job_id.as_deref(),
            attempt = job.attempts,
            "Job started",
        );

        let work = self.handler.handle(job.payload.clone());
        let soft_limit = self.settings.soft_limit;
        let limited = async {
            tokio::pin!(work);
            if let Some(soft) = soft_limit {
                tokio::select! {
                    result = &mut work => return result,
                    _ = tokio::time::sleep(soft) => {
                        tracing::warn!(
                            queue = self.settings.queue_name,
                            queue_job_id = job.id,
                            soft_limit_secs = soft.as_secs(),
                            "Job exceeded its soft time limit",
                        );
                    }
                }
            }
            work.await
        };

        let outcome = match tokio::time::timeout(self.settings.hard_limit, limited).await {
            Ok(Ok(())) => {
                QueueRepo::ack(&self.pool, job.id).await?;
                tracing::info!(
                    queue = self.settings.queue_name,
                    queue_job_id = job.id,
                    job_id = job.job_id.as_deref(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed",
                );
                JobOutcome::Acked
            }
            Ok(Err(e)) => self.settle_failure(&job, e.disposition(), &e.to_string()).await?,
            Err(_) => {
                let message = format!(
                    "hard time limit of {}s exceeded",
                    self.settings.hard_limit.as_secs()
                );
                self.settle_failure(&job, Disposition::Retry, &message).await?
            }
        };
        Ok(outcome)
    }

    async fn settle_failure(
        &self,
        job: &QueueJob,
        disposition: Disposition,
        error: &str,
    ) -> Result<JobOutcome, sqlx::Error> {
        let queue = self.settings.queue_name;
        match disposition {
            Disposition::Retry => {
                let delay = retry_delay(self.settings.retry_base_delay, job.attempts);
                let status = QueueRepo::retry(&self.pool, job.id, error, delay).await?;
                if status == Some(QueueJobStatus::Dead) {
                    tracing::error!(
                        queue,
                        queue_job_id = job.id,
                        job_id = job.job_id.as_deref(),
                        attempt = job.attempts,
                        error,
                        "Job failed on its final attempt; dead-lettered",
                    );
                    Ok(JobOutcome::DeadLettered)
                } else {
                    tracing::warn!(
                        queue,
                        queue_job_id = job.id,
                        job_id = job.job_id.as_deref(),
                        attempt = job.attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error,
                        "Job failed; retry scheduled",
                    );
                    Ok(JobOutcome::Retried)
                }
            }
            Disposition::Reject => {
                QueueRepo::dead_letter(&self.pool, job.id, error).await?;
                tracing::warn!(
                    queue,
                    queue_job_id = job.id,
                    job_id = job.job_id.as_deref(),
                    error,
                    "Job rejected",
                );
                Ok(JobOutcome::DeadLettered)
            }
            Disposition::Fatal => {
                QueueRepo::dead_letter(&self.pool, job.id, error).await?;
                tracing::error!(
                    queue,
                    queue_job_id = job.id,
                    job_id = job.job_id.as_deref(),
                    error,
                    "Job failed with a non-retryable error; dead-lettered",
                );
                Ok(JobOutcome::DeadLettered)
            }
        }
    }
}
