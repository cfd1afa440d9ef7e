#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use pictor_api::auth::jwt::{generate_access_token, JwtConfig};
use pictor_api::config::ServerConfig;
use pictor_api::router::build_app_router;
use pictor_api::state::AppState;
use pictor_cloud::MemoryBlobStore;
use pictor_core::model_config::ModelType;
use pictor_core::naming::prediction_storage_key;
use pictor_core::storage::BlobStore;
use pictor_core::types::{Credits, DbId};
use pictor_db::models::account::{Account, CreateAccount};
use pictor_db::models::model_config::{CreateModelConfig, ModelConfig};
use pictor_db::models::prediction::{CreatePrediction, Prediction};
use pictor_db::models::status::PredictionStatus;
use pictor_db::repositories::{AccountRepo, ModelConfigRepo, PredictionRepo};
use pictor_pipeline::queue::RecordingQueue;

pub const DEMO_EMAIL: &str = "demo@pictor.test";
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-for-api-tests".to_string(),
            access_token_expiry_mins: 5,
        },
    }
}

/// The application under test plus handles on its in-memory capabilities.
pub struct TestApp {
    pub router: Router,
    pub queue: Arc<RecordingQueue>,
    pub store: Arc<MemoryBlobStore>,
    pub config: ServerConfig,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn token_for(&self, account_id: DbId) -> String {
        generate_access_token(account_id, &self.config.jwt).unwrap()
    }
}

/// Full router and middleware stack over `pool`, an in-memory blob store
/// and a recording queue.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let queue = Arc::new(RecordingQueue::new());
    let store = Arc::new(MemoryBlobStore::default());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        queue: queue.clone(),
        store: store.clone(),
        presign_ttl: Duration::from_secs(600),
        demo_account_email: Some(Arc::from(DEMO_EMAIL)),
    };

    TestApp {
        router: build_app_router(state, &config),
        queue,
        store,
        config,
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

pub async fn create_model(
    pool: &PgPool,
    name: &str,
    model_type: ModelType,
    cost: Credits,
) -> ModelConfig {
    ModelConfigRepo::create(
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

/// Insert a finished prediction for `account_id` and store its image.
pub async fn create_prediction(
    pool: &PgPool,
    store: &MemoryBlobStore,
    account_id: DbId,
    prompt: &str,
    job_token: &str,
) -> Prediction {
    let storage_key = prediction_storage_key(account_id, "png");
    store
        .put(&storage_key, PNG_BYTES.to_vec(), "image/png")
        .await
        .unwrap();
    PredictionRepo::create(
        pool,
        &CreatePrediction {
            account_id,
            source_prompt: prompt.to_string(),
            translated_prompt: Some(prompt.to_string()),
            public_url: store.public_url(&storage_key),
            storage_key,
            credits_charged: 5,
            status: PredictionStatus::Success,
            job_token: Some(job_token.to_string()),
        },
    )
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
