//! Blob storage for input assets.
//!
//! When configured, uploaded source images are stored in an S3 bucket and
//! the workflow engine receives a public URL instead of an engine-side
//! upload. [`BlobStore`] keeps the handlers independent of the provider.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

/// Default key prefix for uploaded inputs.
pub const DEFAULT_PREFIX: &str = "uploads";

/// Errors from a blob store backend.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Blob upload failed: {0}")]
    Upload(String),
}

/// Write-only object storage returning publicly reachable URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under a fresh key derived from `file_name` and return
    /// the object's public URL.
    async fn put(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, BlobError>;
}

/// Replace anything outside `[A-Za-z0-9._-]` so client file names are safe
/// inside object keys and URLs.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Build a unique object key: `{prefix}/{uuid}-{sanitized name}`.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let name = format!("{}-{}", uuid::Uuid::now_v7(), sanitize_file_name(file_name));
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

/// Join a public base URL and an object key.
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}

/// S3-backed blob store.
///
/// Credentials and region come from the standard AWS environment chain.
/// Objects must be publicly readable under `public_base_url` (bucket
/// policy or CDN) for the engine to fetch them.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    public_base_url: String,
}

impl S3BlobStore {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: String,
        prefix: String,
        public_base_url: String,
    ) -> Self {
        Self {
            client,
            bucket,
            prefix,
            public_base_url,
        }
    }

    /// Build a client from the AWS environment.
    pub async fn from_env(bucket: String, prefix: String, public_base_url: String) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        let client = aws_sdk_s3::Client::new(&sdk_config);
        Self::new(client, bucket, prefix, public_base_url)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, BlobError> {
        let key = object_key(&self.prefix, file_name);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| BlobError::Upload(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(bucket = %self.bucket, key = %key, size, "Stored input asset");
        Ok(public_url(&self.public_base_url, &key))
    }
}
