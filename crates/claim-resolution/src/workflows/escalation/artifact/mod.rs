//! Legal package assembly: discrepancy report plus contractor photos in one archive.
//!
//! Assembly is all-or-nothing. Any render, signing, download or packing failure aborts
//! with the cause and no bytes leave the process.

pub mod archive;
pub mod report;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use self::archive::PhotoBlob;
use super::domain::{ClaimSnapshot, PhotoDocument};
use super::notify::Attachment;
use super::storage::{BlobFetcher, ObjectStorage, StorageError};
use crate::workflows::analysis::domain::AuditReport;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("audit report is missing its {0}")]
    Incomplete(&'static str),
    #[error("report rendering failed")]
    Render(#[from] std::fmt::Error),
    #[error("photo {position} of {total} ({file_name}) could not be retrieved: {source}")]
    Photo {
        position: usize,
        total: usize,
        file_name: String,
        #[source]
        source: StorageError,
    },
    #[error("archive packing failed: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Transient package handed to the notification cascade and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub photo_count: usize,
}

impl GeneratedArtifact {
    pub fn into_attachment(self) -> Attachment {
        Attachment {
            file_name: self.file_name,
            content_type: "application/zip".to_string(),
            bytes: self.bytes,
        }
    }
}

pub struct ArtifactAssembler {
    storage: Arc<dyn ObjectStorage>,
    fetcher: Arc<dyn BlobFetcher>,
    url_ttl: Duration,
}

impl ArtifactAssembler {
    pub fn new(storage: Arc<dyn ObjectStorage>, fetcher: Arc<dyn BlobFetcher>, url_ttl: Duration) -> Self {
        Self {
            storage,
            fetcher,
            url_ttl,
        }
    }

    pub async fn assemble(
        &self,
        snapshot: &ClaimSnapshot,
        report: &AuditReport,
        photos: &[PhotoDocument],
        generated_at: DateTime<Utc>,
    ) -> Result<GeneratedArtifact, ArtifactError> {
        let html = report::render(snapshot, report, generated_at)?;

        let total = photos.len();
        let mut blobs = Vec::with_capacity(total);
        for (index, photo) in photos.iter().enumerate() {
            let position = index + 1;
            let bytes = self.download(photo).await.map_err(|source| {
                warn!(
                    claim_id = %snapshot.claim_id.0,
                    position,
                    total,
                    error = %source,
                    "photo download failed, aborting legal package"
                );
                ArtifactError::Photo {
                    position,
                    total,
                    file_name: photo.file_name.clone(),
                    source,
                }
            })?;
            blobs.push(PhotoBlob {
                file_name: photo.file_name.clone(),
                content_type: photo.content_type.clone(),
                bytes,
            });
        }

        let bytes = archive::pack(&html, &blobs)?;
        debug!(
            claim_id = %snapshot.claim_id.0,
            photos = total,
            bytes = bytes.len(),
            "legal package assembled"
        );

        Ok(GeneratedArtifact {
            file_name: format!("legal_package_{}.zip", file_stem(snapshot.display_number())),
            bytes,
            photo_count: total,
        })
    }

    async fn download(&self, photo: &PhotoDocument) -> Result<Vec<u8>, StorageError> {
        let url = self
            .storage
            .signed_download_url(&photo.storage_key, self.url_ttl)?;
        self.fetcher.fetch(&url).await
    }
}

fn file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
