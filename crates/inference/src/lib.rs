//! HTTP clients for the inference server hosting the translation and
//! image-generation models.
//!
//! The handles are built once at startup and shared read-only behind
//! `Arc<dyn Translator>` / `Arc<dyn ImageGenerator>`.

pub mod api;
pub mod generator;
pub mod translator;

pub use api::{InferenceApi, InferenceApiError};
pub use generator::HttpImageGenerator;
pub use translator::HttpTranslator;
