#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use pictor_cloud::MemoryBlobStore;
use pictor_core::inference::{GenerationError, ImageGenerator, TranslationError, Translator};
use pictor_core::model_config::ModelType;
use pictor_core::types::Credits;
use pictor_db::models::account::{Account, CreateAccount};
use pictor_db::models::model_config::{CreateModelConfig, ModelConfig};
use pictor_db::repositories::AccountRepo;
use pictor_pipeline::catalog::register_model;
use pictor_pipeline::config::PipelineConfig;
use pictor_pipeline::consumer::ConsumerSettings;
use pictor_pipeline::generation::GenerationWorker;
use pictor_pipeline::queue::JobQueue;

/// PNG signature plus the start of an IHDR chunk; enough for format sniffing.
pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
];

// ---------------------------------------------------------------------------
// Scripted ML capabilities
// ---------------------------------------------------------------------------

/// Prefixes prompts with `en: `, or returns a fixed reply. Fails the first
/// `failures` calls.
#[derive(Default)]
pub struct ScriptedTranslator {
    reply: Option<String>,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedTranslator {
    pub fn prefixing() -> Self {
        Self::default()
    }

    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    pub fn failing(times: usize) -> Self {
        Self {
            failures: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TranslationError("translator offline".into()));
        }
        Ok(match &self.reply {
            Some(reply) => reply.clone(),
            None => format!("en: {text}"),
        })
    }
}

/// Returns fixed bytes for every prompt and records the prompts it saw.
pub struct ScriptedGenerator {
    bytes: Vec<u8>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn png() -> Self {
        Self::returning(PNG_BYTES.to_vec())
    }

    pub fn returning(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.bytes.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_account(pool: &PgPool, email: &str, balance: Credits) -> Account {
    AccountRepo::create(
        pool,
        &CreateAccount {
            email: email.to_string(),
            initial_balance: Some(balance),
        },
    )
    .await
    .unwrap()
}

pub async fn create_image_model(pool: &PgPool, name: &str, cost: Credits) -> ModelConfig {
    create_model(pool, name, ModelType::ImageGeneration, cost).await
}

pub async fn create_model(
    pool: &PgPool,
    name: &str,
    model_type: ModelType,
    cost: Credits,
) -> ModelConfig {
    register_model(
        pool,
        &CreateModelConfig {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            model_type: model_type.as_str().to_string(),
            engine: "diffusers".to_string(),
            version: None,
            cost_credits: cost,
            is_active: Some(true),
        },
    )
    .await
    .unwrap()
}

/// Pipeline settings for tests: immediate retries, short limits.
pub fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        generation_hard_limit: Duration::from_secs(5),
        generation_soft_limit: Duration::from_secs(4),
        persistence_hard_limit: Duration::from_secs(5),
        retry_base_delay: Duration::ZERO,
        poll_interval: Duration::from_millis(20),
        ..PipelineConfig::default()
    }
}

pub fn generation_settings() -> ConsumerSettings {
    ConsumerSettings::generation(&test_pipeline_config())
}

pub fn persistence_settings() -> ConsumerSettings {
    ConsumerSettings::persistence(&test_pipeline_config())
}

pub fn generation_worker(
    translator: Arc<dyn Translator>,
    generator: Arc<dyn ImageGenerator>,
    store: Arc<MemoryBlobStore>,
    queue: Arc<dyn JobQueue>,
) -> GenerationWorker {
    GenerationWorker::new(translator, generator, store, queue)
}
