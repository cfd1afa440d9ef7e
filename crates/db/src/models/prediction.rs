//! Prediction (generated image) entity and DTOs.

use pictor_core::types::{Credits, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{PredictionStatus, StatusId};

/// A row from the `predictions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Prediction {
    pub id: DbId,
    pub account_id: DbId,
    pub source_prompt: String,
    pub translated_prompt: Option<String>,
    pub storage_key: String,
    pub public_url: String,
    pub credits_charged: Credits,
    pub status_id: StatusId,
    pub job_token: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Prediction {
    pub fn status(&self) -> Option<PredictionStatus> {
        PredictionStatus::from_id(self.status_id)
    }
}

/// DTO for inserting a prediction row.
#[derive(Debug, Clone)]
pub struct CreatePrediction {
    pub account_id: DbId,
    pub source_prompt: String,
    pub translated_prompt: Option<String>,
    pub storage_key: String,
    pub public_url: String,
    pub credits_charged: Credits,
    pub status: PredictionStatus,
    pub job_token: Option<String>,
}

/// Query parameters for `GET /api/v1/predictions`.
#[derive(Debug, Default, Deserialize)]
pub struct PredictionListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
