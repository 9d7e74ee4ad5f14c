//! Stored file handling for payment proofs and report photos.
//!
//! Files land in a configured directory under a random name and are served
//! statically; the rest of the system only ever sees the public
//! `/uploads/<filename>` URL.

use crate::error::{ApiError, Result};
use std::path::PathBuf;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "pdf"];

/// A persisted upload.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub filename: String,
    /// Public URL, e.g. `/uploads/3f2a….jpg`.
    pub url: String,
}

/// Writes uploads to disk with size and extension constraints.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_size: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            dir: dir.into(),
            max_size,
        }
    }

    /// The directory uploads are written to (and served from).
    #[must_use]
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Persist an upload and return its stored location.
    ///
    /// Rejects empty and oversized payloads and any extension outside the
    /// image/PDF whitelist; all rejections are validation errors.
    pub async fn store(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<StoredFile> {
        if bytes.is_empty() {
            return Err(ApiError::validation("Uploaded file is empty"));
        }
        if bytes.len() > self.max_size {
            return Err(ApiError::validation(format!(
                "File size {} exceeds maximum {}",
                bytes.len(),
                self.max_size
            )));
        }

        let extension = original_name
            .and_then(|name| name.rsplit('.').next())
            .map(str::to_lowercase)
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| {
                ApiError::validation(format!(
                    "File type not allowed; expected one of: {}",
                    ALLOWED_EXTENSIONS.join(", ")
                ))
            })?;

        let filename = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let path = self.dir.join(&filename);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create upload dir: {e}")))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store upload: {e}")))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "upload stored");

        Ok(StoredFile {
            url: format!("/uploads/{filename}"),
            filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> UploadStore {
        let dir = std::env::temp_dir().join(format!("pondok-uploads-{}", Uuid::new_v4().simple()));
        UploadStore::new(dir, 1024)
    }

    #[tokio::test]
    async fn stores_and_names_by_uuid() {
        let store = test_store();
        let stored = store.store(Some("bukti.JPG"), b"fake image").await.unwrap();

        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.filename.ends_with(".jpg"));

        let on_disk = tokio::fs::read(store.dir().join(&stored.filename))
            .await
            .unwrap();
        assert_eq!(on_disk, b"fake image");
    }

    #[tokio::test]
    async fn rejects_empty_file() {
        let err = test_store().store(Some("bukti.jpg"), b"").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let big = vec![0u8; 2048];
        let err = test_store().store(Some("bukti.jpg"), &big).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }

    #[tokio::test]
    async fn rejects_disallowed_extension() {
        let store = test_store();
        assert!(store.store(Some("payload.exe"), b"x").await.is_err());
        assert!(store.store(None, b"x").await.is_err());
    }
}
