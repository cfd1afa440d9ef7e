//! Job payloads and queue constants for the two-stage pipeline.
//!
//! Stage one (generation) carries everything needed to produce an image.
//! Stage two (persistence) carries everything needed to debit and record it,
//! so it never has to look back at stage one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Credits, DbId};

// ---------------------------------------------------------------------------
// Queues
// ---------------------------------------------------------------------------

/// Queue consumed by the generation worker.
pub const GENERATION_QUEUE: &str = "generation";
/// Routing key for generation jobs.
pub const GENERATION_ROUTING_KEY: &str = "ml.generate";

/// Queue consumed by the persistence worker.
pub const PERSISTENCE_QUEUE: &str = "persistence";
/// Routing key for persistence jobs.
pub const PERSISTENCE_ROUTING_KEY: &str = "db.save";

// ---------------------------------------------------------------------------
// Time limits and retry policy defaults
// ---------------------------------------------------------------------------

/// Hard wall-clock cap for one generation attempt.
pub const GENERATION_HARD_LIMIT: Duration = Duration::from_secs(600);
/// Soft threshold after which a generation attempt logs a warning.
pub const GENERATION_SOFT_LIMIT: Duration = Duration::from_secs(540);
/// Hard cap for one persistence attempt (database work only).
pub const PERSISTENCE_HARD_LIMIT: Duration = Duration::from_secs(30);

/// Default delivery attempts before a generation job is dead-lettered.
pub const DEFAULT_GENERATION_MAX_ATTEMPTS: i32 = 3;
/// Default delivery attempts before a persistence job is dead-lettered.
pub const DEFAULT_PERSISTENCE_MAX_ATTEMPTS: i32 = 5;

/// Longest prompt accepted at submission, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Stage-one payload: enqueued by submission, consumed by the generation worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub account_id: DbId,
    pub prompt: String,
    /// Cost snapshotted from the model at submission time.
    pub cost: Credits,
    pub job_token: String,
}

/// Stage-two payload: enqueued by the generation worker, consumed by the
/// persistence worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceJob {
    pub account_id: DbId,
    pub original_prompt: String,
    pub translated_prompt: String,
    pub storage_key: String,
    pub public_url: String,
    pub cost: Credits,
    pub job_token: String,
}

impl GenerationJob {
    /// Build the stage-two payload from this job and the generation results.
    pub fn into_persistence(
        self,
        translated_prompt: String,
        storage_key: String,
        public_url: String,
    ) -> PersistenceJob {
        PersistenceJob {
            account_id: self.account_id,
            original_prompt: self.prompt,
            translated_prompt,
            storage_key,
            public_url,
            cost: self.cost,
            job_token: self.job_token,
        }
    }
}

/// Trim a submitted prompt and enforce the non-empty / length rules.
pub fn normalize_prompt(prompt: &str) -> Result<String, CoreError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".into()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt is too long ({chars} characters, max {MAX_PROMPT_CHARS})"
        )));
    }
    Ok(trimmed.to_string())
}
