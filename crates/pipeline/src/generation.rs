//! Stage one: translate, generate, store, forward.
//!
//! This stage has no financial side effects, so a failed or timed-out
//! delivery can be retried wholesale. A retry after a successful store
//! writes a second blob under a new key; only the one referenced by the
//! persisted prediction is ever served.

use std::sync::Arc;

use async_trait::async_trait;
use pictor_core::inference::{sniff_image, translated_or_original, ImageGenerator, Translator};
use pictor_core::jobs::{GenerationJob, PersistenceJob};
use pictor_core::naming::prediction_storage_key;
use pictor_core::storage::BlobStore;

use crate::consumer::JobHandler;
use crate::error::PipelineError;
use crate::queue::{enqueue_persistence, JobQueue};

/// Capabilities the generation stage runs against.
#[derive(Clone)]
pub struct GenerationWorker {
    translator: Arc<dyn Translator>,
    generator: Arc<dyn ImageGenerator>,
    store: Arc<dyn BlobStore>,
    queue: Arc<dyn JobQueue>,
}

impl GenerationWorker {
    pub fn new(
        translator: Arc<dyn Translator>,
        generator: Arc<dyn ImageGenerator>,
        store: Arc<dyn BlobStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            translator,
            generator,
            store,
            queue,
        }
    }

    /// Run one generation job and enqueue its persistence job.
    pub async fn process(&self, job: GenerationJob) -> Result<PersistenceJob, PipelineError> {
        let translated = self.translator.translate(&job.prompt).await?;
        let translated = translated_or_original(translated, &job.prompt);

        let bytes = self.generator.generate(&translated).await?;
        let kind = sniff_image(&bytes)?;

        let storage_key = prediction_storage_key(job.account_id, kind.extension());
        self.store
            .put(&storage_key, bytes, kind.content_type())
            .await?;
        let public_url = self.store.public_url(&storage_key);

        tracing::info!(
            account_id = job.account_id,
            job_token = %job.job_token,
            storage_key = %storage_key,
            "Image stored",
        );

        let next = job.into_persistence(translated, storage_key, public_url);
        if !enqueue_persistence(self.queue.as_ref(), &next).await? {
            tracing::info!(
                job_token = %next.job_token,
                "Persistence job already enqueued by an earlier delivery",
            );
        }
        Ok(next)
    }
}

#[async_trait]
impl JobHandler for GenerationWorker {
    async fn handle(&self, payload: serde_json::Value) -> Result<(), PipelineError> {
        let job: GenerationJob = serde_json::from_value(payload)?;
        self.process(job).await.map(|_| ())
    }
}
