use std::sync::Arc;
use std::time::Duration;

use pictor_core::storage::BlobStore;
use pictor_pipeline::queue::JobQueue;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: pictor_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Producer side of the job queue.
    pub queue: Arc<dyn JobQueue>,
    pub store: Arc<dyn BlobStore>,
    /// Lifetime of presigned image URLs.
    pub presign_ttl: Duration,
    /// Owner of the public demo predictions, if configured.
    pub demo_account_email: Option<Arc<str>>,
}

impl AppState {
    pub fn demo_email(&self) -> Option<&str> {
        self.demo_account_email.as_deref()
    }
}
