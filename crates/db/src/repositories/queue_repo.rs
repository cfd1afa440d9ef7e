//! Repository for the `queue_jobs` table: a durable, at-least-once job
//! queue with leases.
//!
//! Lifecycle: `pending` --claim--> `running` --ack--> `done`.
//! A failed delivery goes back to `pending` with a delay, or to `dead`
//! once `attempts` reaches `max_attempts`. A `running` job whose lease
//! expired is claimable again, which is how crashed workers' jobs are
//! redelivered.

use std::time::Duration;

use pictor_core::types::DbId;
use sqlx::PgPool;

use crate::models::queue_job::QueueJob;
use crate::models::status::{QueueJobStatus, StatusId};

/// Column list for `queue_jobs` queries.
const COLUMNS: &str = "\
    id, queue_name, routing_key, job_id, payload, status_id, attempts, max_attempts, \
    available_at, locked_until, last_error, completed_at, created_at, updated_at";

/// Last error recorded when a lease runs out on the final attempt.
const LEASE_EXPIRED_ERROR: &str = "lease expired on final attempt";

/// Provides enqueue, claim and settlement operations for queued jobs.
pub struct QueueRepo;

impl QueueRepo {
    /// Enqueue a job. When `job_id` is set and a job with the same id is
    /// already in `queue_name`, nothing is inserted and `None` is returned.
    pub async fn enqueue(
        pool: &PgPool,
        queue_name: &str,
        routing_key: &str,
        job_id: Option<&str>,
        payload: &serde_json::Value,
        max_attempts: i32,
    ) -> Result<Option<QueueJob>, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_jobs \
                (queue_name, routing_key, job_id, payload, status_id, max_attempts) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (queue_name, job_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(queue_name)
            .bind(routing_key)
            .bind(job_id)
            .bind(payload)
            .bind(QueueJobStatus::Pending.id())
            .bind(max_attempts)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the next deliverable job on a queue.
    ///
    /// Deliverable means pending and due, or running with an expired lease
    /// and attempts left. Uses `FOR UPDATE SKIP LOCKED` so concurrent
    /// consumers never claim the same row.
    pub async fn claim(
        pool: &PgPool,
        queue_name: &str,
        lease: Duration,
    ) -> Result<Option<QueueJob>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_jobs \
             SET status_id = $2, attempts = attempts + 1, \
                 locked_until = NOW() + make_interval(secs => $4) \
             WHERE id = ( \
                 SELECT id FROM queue_jobs \
                 WHERE queue_name = $1 \
                   AND attempts < max_attempts \
                   AND ((status_id = $3 AND available_at <= NOW()) \
                        OR (status_id = $2 AND locked_until < NOW())) \
                 ORDER BY available_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(queue_name)
            .bind(QueueJobStatus::Running.id())
            .bind(QueueJobStatus::Pending.id())
            .bind(lease.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Mark a running job as done. Returns `false` if it was not running.
    pub async fn ack(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queue_jobs \
             SET status_id = $2, locked_until = NULL, completed_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(QueueJobStatus::Done.id())
        .bind(QueueJobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release a failed delivery for another attempt after `delay`, or
    /// dead-letter it when no attempts remain. Returns the resulting
    /// status, or `None` if the job does not exist.
    pub async fn retry(
        pool: &PgPool,
        id: DbId,
        error: &str,
        delay: Duration,
    ) -> Result<Option<QueueJobStatus>, sqlx::Error> {
        let status: Option<StatusId> = sqlx::query_scalar(
            "UPDATE queue_jobs \
             SET status_id = CASE WHEN attempts >= max_attempts THEN $4 ELSE $3 END, \
                 available_at = NOW() + make_interval(secs => $5), \
                 locked_until = NULL, \
                 last_error = $2, \
                 completed_at = CASE WHEN attempts >= max_attempts THEN NOW() ELSE NULL END \
             WHERE id = $1 \
             RETURNING status_id",
        )
        .bind(id)
        .bind(error)
        .bind(QueueJobStatus::Pending.id())
        .bind(QueueJobStatus::Dead.id())
        .bind(delay.as_secs_f64())
        .fetch_optional(pool)
        .await?;
        Ok(status.and_then(QueueJobStatus::from_id))
    }

    /// Move a job straight to `dead` without further attempts.
    pub async fn dead_letter(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queue_jobs \
             SET status_id = $3, locked_until = NULL, last_error = $2, completed_at = NOW() \
             WHERE id = $1 AND status_id <> $4",
        )
        .bind(id)
        .bind(error)
        .bind(QueueJobStatus::Dead.id())
        .bind(QueueJobStatus::Done.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Dead-letter running jobs whose lease expired on their last allowed
    /// attempt. Such rows are no longer claimable and would otherwise sit
    /// in `running` forever. Returns the number of rows moved.
    pub async fn reap_expired(pool: &PgPool, queue_name: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queue_jobs \
             SET status_id = $3, locked_until = NULL, completed_at = NOW(), \
                 last_error = COALESCE(last_error, $4) \
             WHERE queue_name = $1 AND status_id = $2 \
               AND locked_until < NOW() AND attempts >= max_attempts",
        )
        .bind(queue_name)
        .bind(QueueJobStatus::Running.id())
        .bind(QueueJobStatus::Dead.id())
        .bind(LEASE_EXPIRED_ERROR)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QueueJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_jobs WHERE id = $1");
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_job_id(
        pool: &PgPool,
        queue_name: &str,
        job_id: &str,
    ) -> Result<Option<QueueJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM queue_jobs WHERE queue_name = $1 AND job_id = $2"
        );
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(queue_name)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_by_status(
        pool: &PgPool,
        queue_name: &str,
        status: QueueJobStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_jobs WHERE queue_name = $1 AND status_id = $2",
        )
        .bind(queue_name)
        .bind(status.id())
        .fetch_one(pool)
        .await
    }

    /// Dead-lettered jobs on a queue, newest first.
    pub async fn list_dead(
        pool: &PgPool,
        queue_name: &str,
        limit: i64,
    ) -> Result<Vec<QueueJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM queue_jobs \
             WHERE queue_name = $1 AND status_id = $2 \
             ORDER BY completed_at DESC NULLS LAST, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, QueueJob>(&query)
            .bind(queue_name)
            .bind(QueueJobStatus::Dead.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
