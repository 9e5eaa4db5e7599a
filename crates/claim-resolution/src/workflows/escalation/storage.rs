//! Object storage access for contractor photos.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::clock::Clock;
use crate::config::StorageConfig;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("object storage is not configured: {0}")]
    NotConfigured(String),
    #[error("object download failed for {url}: {message}")]
    Download { url: String, message: String },
    #[error("object download failed for {url} with status {status}")]
    Status { url: String, status: u16 },
}

/// Issues short-lived signed download URLs for stored objects.
pub trait ObjectStorage: Send + Sync {
    fn signed_download_url(&self, storage_key: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Fetches the bytes behind a signed URL.
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError>;
}

/// Query-string signed URLs: `signature = sha256(key \n expires \n secret)`, hex encoded.
pub struct SignedUrlStorage {
    base_url: String,
    signing_key: Option<String>,
    clock: Arc<dyn Clock>,
}

impl SignedUrlStorage {
    pub fn new(config: &StorageConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signing_key: config.signing_key.clone(),
            clock,
        }
    }

    fn signature(secret: &str, storage_key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(storage_key.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl ObjectStorage for SignedUrlStorage {
    fn signed_download_url(&self, storage_key: &str, ttl: Duration) -> Result<String, StorageError> {
        let secret = self.signing_key.as_deref().ok_or_else(|| {
            StorageError::NotConfigured("STORAGE_SIGNING_KEY is not set".to_string())
        })?;
        let key = storage_key.trim_start_matches('/');
        let expires = self.clock.now().timestamp() + ttl.as_secs() as i64;

        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.base_url,
            key,
            expires,
            Self::signature(secret, key, expires)
        ))
    }
}

pub struct HttpBlobFetcher {
    client: reqwest::Client,
}

impl HttpBlobFetcher {
    pub fn new(timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StorageError::NotConfigured(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BlobFetcher for HttpBlobFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let download_error = |err: reqwest::Error| StorageError::Download {
            url: redact(url),
            message: err.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(download_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                url: redact(url),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(download_error)?;
        Ok(bytes.to_vec())
    }
}

/// Drops the query string so signatures never reach logs or error bodies.
fn redact(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}
