//! Environment-driven configuration shared by the worker and API binaries.
//!
//! Every struct has a `from_env()` constructor and a `from_lookup()`
//! variant taking an explicit variable source, so parsing can be tested
//! without touching the process environment.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use pictor_cloud::{MemoryBlobStore, S3BlobStore, S3Settings};
use pictor_core::inference::{ImageGenerator, Translator};
use pictor_core::jobs::{
    DEFAULT_GENERATION_MAX_ATTEMPTS, DEFAULT_PERSISTENCE_MAX_ATTEMPTS, GENERATION_HARD_LIMIT,
    GENERATION_SOFT_LIMIT, PERSISTENCE_HARD_LIMIT,
};
use pictor_core::model_config::{ModelType, DEFAULT_MODELS};
use pictor_core::storage::{BlobStore, DEFAULT_PRESIGN_TTL};
use pictor_inference::{HttpImageGenerator, HttpTranslator, InferenceApi};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("Failed to build inference client: {0}")]
    Inference(String),
}

// ---------------------------------------------------------------------------
// Variable source
// ---------------------------------------------------------------------------

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parse_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }

    fn secs_or(&self, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse_or(name, default.as_secs()).map(Duration::from_secs)
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// | Env Var                    | Default    |
    /// |----------------------------|------------|
    /// | `DATABASE_URL`             | (required) |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);
        Ok(Self {
            url: vars.required("DATABASE_URL")?,
            max_connections: vars
                .parse_or("DATABASE_MAX_CONNECTIONS", pictor_db::DEFAULT_MAX_CONNECTIONS)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Blob storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    S3,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: BlobBackend,
    pub s3: S3Settings,
    pub presign_ttl: Duration,
}

impl StorageConfig {
    /// | Env Var                | Default     |
    /// |------------------------|-------------|
    /// | `BLOB_STORE`           | `s3`        |
    /// | `S3_BUCKET`            | `images`    |
    /// | `S3_ENDPOINT`          | (AWS)       |
    /// | `S3_PUBLIC_ENDPOINT`   | endpoint    |
    /// | `S3_REGION`            | `us-east-1` |
    /// | `S3_ACCESS_KEY_ID`     | (chain)     |
    /// | `S3_SECRET_ACCESS_KEY` | (chain)     |
    /// | `S3_ADDRESSING_STYLE`  | `path`      |
    /// | `PRESIGN_TTL_SECS`     | `3600`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let backend = match vars.optional("BLOB_STORE").as_deref() {
            None | Some("s3") => BlobBackend::S3,
            Some("memory") => BlobBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "BLOB_STORE",
                    value: other.to_string(),
                })
            }
        };

        let path_style = match vars.optional("S3_ADDRESSING_STYLE").as_deref() {
            None | Some("path") => true,
            Some("virtual") => false,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "S3_ADDRESSING_STYLE",
                    value: other.to_string(),
                })
            }
        };

        let s3 = S3Settings {
            bucket: vars.optional("S3_BUCKET").unwrap_or_else(|| "images".into()),
            endpoint: vars.optional("S3_ENDPOINT"),
            public_endpoint: vars.optional("S3_PUBLIC_ENDPOINT"),
            region: vars.optional("S3_REGION"),
            access_key_id: vars.optional("S3_ACCESS_KEY_ID"),
            secret_access_key: vars.optional("S3_SECRET_ACCESS_KEY"),
            path_style,
        };

        Ok(Self {
            backend,
            s3,
            presign_ttl: vars.secs_or("PRESIGN_TTL_SECS", DEFAULT_PRESIGN_TTL)?,
        })
    }

    /// Build the configured store.
    pub async fn connect(&self) -> Arc<dyn BlobStore> {
        match self.backend {
            BlobBackend::S3 => Arc::new(S3BlobStore::connect(self.s3.clone()).await),
            BlobBackend::Memory => {
                tracing::warn!("Using in-memory blob store; objects are lost on restart");
                Arc::new(MemoryBlobStore::new(self.s3.bucket.clone()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub translation_model: String,
    pub generation_model: String,
}

/// Name of the first seeded model of `model_type`.
fn default_model_name(model_type: ModelType) -> String {
    DEFAULT_MODELS
        .iter()
        .find(|m| m.model_type == model_type)
        .map(|m| m.name.to_string())
        .unwrap_or_default()
}

impl InferenceConfig {
    /// | Env Var                       | Default                      |
    /// |-------------------------------|------------------------------|
    /// | `INFERENCE_BASE_URL`          | (required by the worker)     |
    /// | `INFERENCE_TIMEOUT_SECS`      | `600`                        |
    /// | `INFERENCE_TRANSLATION_MODEL` | `Helsinki-NLP/opus-mt-ru-en` |
    /// | `INFERENCE_GENERATION_MODEL`  | `dreamshaper_v8`             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);
        Ok(Self {
            base_url: vars.optional("INFERENCE_BASE_URL"),
            timeout: vars.secs_or("INFERENCE_TIMEOUT_SECS", GENERATION_HARD_LIMIT)?,
            translation_model: vars
                .optional("INFERENCE_TRANSLATION_MODEL")
                .unwrap_or_else(|| default_model_name(ModelType::Translation)),
            generation_model: vars
                .optional("INFERENCE_GENERATION_MODEL")
                .unwrap_or_else(|| default_model_name(ModelType::ImageGeneration)),
        })
    }

    /// Build the shared translator and generator handles.
    pub fn build(&self) -> Result<(Arc<dyn Translator>, Arc<dyn ImageGenerator>), ConfigError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(ConfigError::Missing("INFERENCE_BASE_URL"))?;
        let api = InferenceApi::new(base_url, self.timeout)
            .map_err(|e| ConfigError::Inference(e.to_string()))?;
        let translator = HttpTranslator::new(api.clone(), self.translation_model.clone());
        let generator = HttpImageGenerator::new(api, self.generation_model.clone());
        Ok((Arc::new(translator), Arc::new(generator)))
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub generation_hard_limit: Duration,
    pub generation_soft_limit: Duration,
    pub persistence_hard_limit: Duration,
    pub generation_max_attempts: i32,
    pub persistence_max_attempts: i32,
    pub generation_concurrency: usize,
    pub persistence_concurrency: usize,
    pub poll_interval: Duration,
    pub retry_base_delay: Duration,
    /// Owner of the public demo predictions. Demo preview and claiming
    /// are disabled when unset.
    pub demo_account_email: Option<String>,
    pub seed_models: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation_hard_limit: GENERATION_HARD_LIMIT,
            generation_soft_limit: GENERATION_SOFT_LIMIT,
            persistence_hard_limit: PERSISTENCE_HARD_LIMIT,
            generation_max_attempts: DEFAULT_GENERATION_MAX_ATTEMPTS,
            persistence_max_attempts: DEFAULT_PERSISTENCE_MAX_ATTEMPTS,
            generation_concurrency: 1,
            persistence_concurrency: 4,
            poll_interval: Duration::from_millis(500),
            retry_base_delay: Duration::from_secs(5),
            demo_account_email: None,
            seed_models: true,
        }
    }
}

impl PipelineConfig {
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `GENERATION_HARD_LIMIT_SECS`  | `600`   |
    /// | `GENERATION_SOFT_LIMIT_SECS`  | `540`   |
    /// | `PERSISTENCE_HARD_LIMIT_SECS` | `30`    |
    /// | `GENERATION_MAX_ATTEMPTS`     | `3`     |
    /// | `PERSISTENCE_MAX_ATTEMPTS`    | `5`     |
    /// | `GENERATION_CONCURRENCY`      | `1`     |
    /// | `PERSISTENCE_CONCURRENCY`     | `4`     |
    /// | `QUEUE_POLL_INTERVAL_MS`      | `500`   |
    /// | `RETRY_BASE_DELAY_SECS`       | `5`     |
    /// | `DEMO_ACCOUNT_EMAIL`          | (unset) |
    /// | `SEED_MODELS`                 | `true`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);
        let d = Self::default();

        let config = Self {
            generation_hard_limit: vars
                .secs_or("GENERATION_HARD_LIMIT_SECS", d.generation_hard_limit)?,
            generation_soft_limit: vars
                .secs_or("GENERATION_SOFT_LIMIT_SECS", d.generation_soft_limit)?,
            persistence_hard_limit: vars
                .secs_or("PERSISTENCE_HARD_LIMIT_SECS", d.persistence_hard_limit)?,
            generation_max_attempts: vars
                .parse_or("GENERATION_MAX_ATTEMPTS", d.generation_max_attempts)?,
            persistence_max_attempts: vars
                .parse_or("PERSISTENCE_MAX_ATTEMPTS", d.persistence_max_attempts)?,
            generation_concurrency: vars
                .parse_or("GENERATION_CONCURRENCY", d.generation_concurrency)?,
            persistence_concurrency: vars
                .parse_or("PERSISTENCE_CONCURRENCY", d.persistence_concurrency)?,
            poll_interval: Duration::from_millis(
                vars.parse_or("QUEUE_POLL_INTERVAL_MS", d.poll_interval.as_millis() as u64)?,
            ),
            retry_base_delay: vars.secs_or("RETRY_BASE_DELAY_SECS", d.retry_base_delay)?,
            demo_account_email: vars.optional("DEMO_ACCOUNT_EMAIL"),
            seed_models: vars.parse_or("SEED_MODELS", d.seed_models)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("GENERATION_MAX_ATTEMPTS", self.generation_max_attempts),
            ("PERSISTENCE_MAX_ATTEMPTS", self.persistence_max_attempts),
        ];
        for (name, value) in positive {
            if value < 1 {
                return Err(ConfigError::Invalid {
                    name,
                    value: value.to_string(),
                });
            }
        }
        if self.generation_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "GENERATION_CONCURRENCY",
                value: "0".into(),
            });
        }
        if self.persistence_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "PERSISTENCE_CONCURRENCY",
                value: "0".into(),
            });
        }
        if self.generation_soft_limit > self.generation_hard_limit {
            return Err(ConfigError::Invalid {
                name: "GENERATION_SOFT_LIMIT_SECS",
                value: self.generation_soft_limit.as_secs().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn pipeline_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.generation_hard_limit, Duration::from_secs(600));
        assert_eq!(config.generation_soft_limit, Duration::from_secs(540));
        assert_eq!(config.persistence_hard_limit, Duration::from_secs(30));
        assert_eq!(config.generation_max_attempts, 3);
        assert_eq!(config.persistence_max_attempts, 5);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert!(config.demo_account_email.is_none());
        assert!(config.seed_models);
    }

    #[test]
    fn pipeline_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("GENERATION_CONCURRENCY", "2"),
            ("DEMO_ACCOUNT_EMAIL", " demo@example.com "),
            ("SEED_MODELS", "false"),
            ("QUEUE_POLL_INTERVAL_MS", "50"),
        ]))
        .unwrap();
        assert_eq!(config.generation_concurrency, 2);
        assert_eq!(config.demo_account_email.as_deref(), Some("demo@example.com"));
        assert!(!config.seed_models);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        assert_matches!(
            PipelineConfig::from_lookup(lookup(&[("GENERATION_MAX_ATTEMPTS", "many")])),
            Err(ConfigError::Invalid { name: "GENERATION_MAX_ATTEMPTS", .. })
        );
        assert_matches!(
            PipelineConfig::from_lookup(lookup(&[("PERSISTENCE_CONCURRENCY", "0")])),
            Err(ConfigError::Invalid { name: "PERSISTENCE_CONCURRENCY", .. })
        );
        assert_matches!(
            PipelineConfig::from_lookup(lookup(&[("GENERATION_SOFT_LIMIT_SECS", "900")])),
            Err(ConfigError::Invalid { name: "GENERATION_SOFT_LIMIT_SECS", .. })
        );
    }

    #[test]
    fn database_url_is_required() {
        assert_matches!(
            DatabaseConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
        let config =
            DatabaseConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap();
        assert_eq!(config.max_connections, 20);
    }

    #[test]
    fn storage_parsing() {
        let config = StorageConfig::from_lookup(lookup(&[
            ("BLOB_STORE", "memory"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("S3_PUBLIC_ENDPOINT", "http://localhost:9000"),
        ]))
        .unwrap();
        assert_eq!(config.backend, BlobBackend::Memory);
        assert_eq!(config.s3.bucket, "images");
        assert!(config.s3.path_style);
        assert_eq!(config.presign_ttl, Duration::from_secs(3600));

        assert_matches!(
            StorageConfig::from_lookup(lookup(&[("BLOB_STORE", "ftp")])),
            Err(ConfigError::Invalid { name: "BLOB_STORE", .. })
        );
    }

    #[test]
    fn inference_models_default_to_seeded_names() {
        let config = InferenceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.translation_model, "Helsinki-NLP/opus-mt-ru-en");
        assert_eq!(config.generation_model, "dreamshaper_v8");
        assert!(matches!(
            config.build(),
            Err(ConfigError::Missing("INFERENCE_BASE_URL"))
        ));
    }

    #[tokio::test]
    async fn memory_backend_connects_without_network() {
        let config = StorageConfig::from_lookup(lookup(&[("BLOB_STORE", "memory")])).unwrap();
        let store = config.connect().await;
        store.put("k.png", vec![1], "image/png").await.unwrap();
        assert_eq!(store.get("k.png").await.unwrap().bytes, vec![1]);
    }
}
