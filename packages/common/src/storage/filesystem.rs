use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::{StorageError, ensure_within_limit};
use super::path::BlobPath;
use super::traits::BlobStore;

/// Filesystem-backed blob store.
///
/// Blobs live at `{base_path}/{blob path}`; writes go through a temp file in
/// `{base_path}/.tmp` and are renamed into place.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    public_base_url: String,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into(),
            max_size,
        })
    }

    fn blob_path(&self, path: &BlobPath) -> PathBuf {
        self.base_path.join(path.as_str())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn put(&self, path: &BlobPath, data: &[u8]) -> Result<(), StorageError> {
        ensure_within_limit(data.len(), self.max_size)?;

        let blob_path = self.blob_path(path);
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn get(&self, path: &BlobPath) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.blob_path(path)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(path)).await?)
    }

    async fn delete(&self, path: &BlobPath) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, path: &BlobPath) -> Result<Option<u64>, StorageError> {
        match fs::metadata(self.blob_path(path)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, path: &BlobPath) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), path)
    }
}
