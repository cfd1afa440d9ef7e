use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pictor_db::repositories::ModelConfigRepo;
use pictor_pipeline::config::{DatabaseConfig, InferenceConfig, PipelineConfig, StorageConfig};
use pictor_pipeline::consumer::{ConsumerSettings, QueueConsumer};
use pictor_pipeline::generation::GenerationWorker;
use pictor_pipeline::persistence::PersistenceWorker;
use pictor_pipeline::queue::{JobQueue, PgJobQueue};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let db_config = DatabaseConfig::from_env().expect("Invalid database configuration");
    let storage_config = StorageConfig::from_env().expect("Invalid storage configuration");
    let inference_config = InferenceConfig::from_env().expect("Invalid inference configuration");
    let pipeline_config = PipelineConfig::from_env().expect("Invalid pipeline configuration");
    tracing::info!(
        generation_concurrency = pipeline_config.generation_concurrency,
        persistence_concurrency = pipeline_config.persistence_concurrency,
        generation_hard_limit_secs = pipeline_config.generation_hard_limit.as_secs(),
        "Loaded worker configuration",
    );

    // --- Database ---
    let pool = pictor_db::create_pool(&db_config.url, db_config.max_connections)
        .await
        .expect("Failed to connect to database");
    pictor_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    pictor_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    if pipeline_config.seed_models {
        let inserted = ModelConfigRepo::seed_defaults(&pool)
            .await
            .expect("Failed to seed default models");
        tracing::info!(inserted, "Default models seeded");
    }

    // --- Capabilities (built once, shared read-only) ---
    let store = storage_config.connect().await;
    let (translator, generator) = inference_config
        .build()
        .expect("Failed to build inference clients");
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool.clone(), &pipeline_config));

    // --- Consumers ---
    let generation = QueueConsumer::new(
        pool.clone(),
        Arc::new(GenerationWorker::new(translator, generator, store, queue)),
        ConsumerSettings::generation(&pipeline_config),
    );
    let persistence = QueueConsumer::new(
        pool.clone(),
        Arc::new(PersistenceWorker::new(pool.clone())),
        ConsumerSettings::persistence(&pipeline_config),
    );

    let cancel = CancellationToken::new();
    let generation_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { generation.run(cancel).await }
    });
    let persistence_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { persistence.run(cancel).await }
    });

    shutdown_signal().await;

    // In-flight jobs finish (or hit their hard limit) before the consumers return.
    cancel.cancel();
    let (generation_result, persistence_result) =
        tokio::join!(generation_handle, persistence_handle);
    if let Err(e) = generation_result {
        tracing::error!(error = %e, "Generation consumer task failed");
    }
    if let Err(e) = persistence_result {
        tracing::error!(error = %e, "Persistence consumer task failed");
    }

    pool.close().await;
    tracing::info!("Worker shut down");
}

/// `RUST_LOG` filter plus a text or JSON (`LOG_FORMAT=json`) formatter.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pictor_worker=debug,pictor_pipeline=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), draining consumers");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, draining consumers");
        }
    }
}
