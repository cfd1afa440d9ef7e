//! S3 / MinIO blob store over `aws-sdk-s3`.
//!
//! Two clients are kept: one against the internal endpoint for reads and
//! writes, and one against the public endpoint used only for presigning so
//! browser-facing URLs carry a host the browser can reach.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use pictor_core::naming::normalize_key;
use pictor_core::storage::{
    build_public_url, BlobStore, StorageError, StoredObject, FALLBACK_CONTENT_TYPE,
};

/// Region used when neither the settings nor the environment name one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Provider name attached to static credentials.
const STATIC_CREDENTIALS_PROVIDER: &str = "pictor-static";

/// Connection settings for an S3-compatible store.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    /// Internal endpoint (e.g. `http://minio:9000`). `None` means AWS.
    pub endpoint: Option<String>,
    /// Browser-reachable endpoint used for presigned and public URLs.
    pub public_endpoint: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Path-style addressing (`{endpoint}/{bucket}/{key}`), the MinIO default.
    pub path_style: bool,
}

pub struct S3BlobStore {
    client: Client,
    presign_client: Client,
    bucket: String,
    public_base: String,
    path_style: bool,
}

impl S3BlobStore {
    /// Build the internal and presigning clients from `settings`.
    pub async fn connect(settings: S3Settings) -> Self {
        let region = RegionProviderChain::first_try(settings.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(DEFAULT_REGION);

        let mut loader =
            aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);
        if let (Some(key_id), Some(secret)) =
            (settings.access_key_id.as_ref(), settings.secret_access_key.as_ref())
        {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                STATIC_CREDENTIALS_PROVIDER,
            ));
        }
        let shared = loader.load().await;

        let build = |endpoint: Option<&String>| {
            let mut builder = aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(settings.path_style);
            if let Some(endpoint) = endpoint {
                builder = builder.endpoint_url(endpoint.as_str());
            }
            Client::from_conf(builder.build())
        };

        let client = build(settings.endpoint.as_ref());
        let presign_endpoint = settings.public_endpoint.as_ref().or(settings.endpoint.as_ref());
        let presign_client = build(presign_endpoint);

        let public_base = match presign_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.s3.amazonaws.com", settings.bucket),
        };
        // AWS virtual-host URLs already name the bucket in the host.
        let path_style = settings.path_style && presign_endpoint.is_some();

        tracing::info!(
            bucket = %settings.bucket,
            endpoint = settings.endpoint.as_deref().unwrap_or("aws"),
            path_style,
            "S3 blob store configured",
        );

        Self {
            client,
            presign_client,
            bucket: settings.bucket,
            public_base,
            path_style,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Map an SDK failure to `StorageError`, recognising missing objects.
fn storage_error<E, R>(key: &str, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some("NoSuchKey") | Some("NotFound") => StorageError::NotFound(key.to_string()),
        _ => StorageError::Backend(DisplayErrorContext(&err).to_string()),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let key = normalize_key(key);
        let length = bytes.len() as i64;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(length)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| storage_error(key, e))?;
        tracing::debug!(storage_key = key, length, "Object stored");
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), StorageError> {
        let src_key = normalize_key(src_key);
        let dst_key = normalize_key(dst_key);
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, src_key))
            .key(dst_key)
            .send()
            .await
            .map_err(|e| storage_error(src_key, e))?;
        tracing::debug!(src_key, dst_key, "Object copied");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let key = normalize_key(key);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error(key, e))?;

        let content_type = output
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(StoredObject {
            length: bytes.len() as u64,
            bytes,
            content_type,
        })
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let key = normalize_key(key);
        let config =
            PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Backend(e.to_string()))?;
        let request = self
            .presign_client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| storage_error(key, e))?;
        Ok(request.uri().to_string())
    }

    fn public_url(&self, key: &str) -> String {
        build_public_url(&self.public_base, &self.bucket, key, self.path_style)
    }
}
