//! Mapping from an external identity provider subject to an account.

use pictor_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `identity_links` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IdentityLink {
    pub id: DbId,
    pub provider: String,
    pub external_id: String,
    pub account_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
