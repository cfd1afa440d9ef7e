//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where callers create rows

pub mod account;
pub mod identity_link;
pub mod ledger_entry;
pub mod model_config;
pub mod prediction;
pub mod queue_job;
pub mod status;
