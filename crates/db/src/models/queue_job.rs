//! Durable queue job entity.

use pictor_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{QueueJobStatus, StatusId};

/// A row from the `queue_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueJob {
    pub id: DbId,
    pub queue_name: String,
    pub routing_key: String,
    pub job_id: Option<String>,
    pub payload: serde_json::Value,
    pub status_id: StatusId,
    /// Number of deliveries so far, including the current one.
    pub attempts: i32,
    pub max_attempts: i32,
    pub available_at: Timestamp,
    pub locked_until: Option<Timestamp>,
    pub last_error: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QueueJob {
    pub fn status(&self) -> Option<QueueJobStatus> {
        QueueJobStatus::from_id(self.status_id)
    }

    /// True when this delivery is the last one the job is allowed.
    pub fn is_final_attempt(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
