//! `BlobStore` implementations: S3/MinIO for deployments and an in-memory
//! store for tests and local runs.

pub mod memory;
pub mod s3;

pub use memory::MemoryBlobStore;
pub use s3::{S3BlobStore, S3Settings};
