//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Operations that must share a
//! caller's transaction take `&mut Transaction` instead.

pub mod account_repo;
pub mod identity_link_repo;
pub mod ledger_repo;
pub mod model_config_repo;
pub mod prediction_repo;
pub mod queue_repo;

pub use account_repo::AccountRepo;
pub use identity_link_repo::IdentityLinkRepo;
pub use ledger_repo::{LedgerError, LedgerRepo};
pub use model_config_repo::ModelConfigRepo;
pub use prediction_repo::PredictionRepo;
pub use queue_repo::QueueRepo;
