//! Domain rules for the credit-metered image generation service.
//!
//! Pure logic and capability traits only; no database or network access.

pub mod error;
pub mod inference;
pub mod jobs;
pub mod ledger;
pub mod model_config;
pub mod naming;
pub mod pagination;
pub mod storage;
pub mod types;
