//! The two-stage generation pipeline and its synchronous surfaces.
//!
//! - [`submit`]: validate, price and enqueue a generation job.
//! - [`generation`]: translate, generate, store the blob, forward.
//! - [`persistence`]: idempotent debit + prediction insert.
//! - [`demo`]: zero-cost copy of a demo prediction into another account.
//! - [`catalog`]: read paths over the prediction and model catalogs.
//! - [`consumer`]: the queue polling loop that drives the workers.

pub mod catalog;
pub mod config;
pub mod consumer;
pub mod demo;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod queue;
pub mod submit;

pub use error::{Disposition, PipelineError};
