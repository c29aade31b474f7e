use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::{StorageError, ensure_within_limit};
use super::path::BlobPath;
use super::traits::BlobStore;
use crate::config::S3StorageConfig;

const BACKEND: &str = "s3";

/// S3-compatible object store (AWS S3, MinIO).
///
/// The client is built without `fail-on-err`, so every response status is
/// inspected here instead of surfacing as an `S3Error`.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    public_base_url: Option<String>,
    max_size: u64,
}

impl S3BlobStore {
    pub fn new(config: &S3StorageConfig, max_size: u64) -> Result<Self, StorageError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", config.region));
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint,
        };

        let credentials = Credentials::new(
            Some(config.access_key.as_str()),
            Some(config.secret_key.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Misconfigured(format!("invalid S3 credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Misconfigured(format!("invalid S3 bucket: {e}")))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            public_base_url: config.public_base_url.clone(),
            max_size,
        })
    }

    /// Status of a HEAD request; 404 comes back as `Ok(404)`.
    async fn head_status(&self, path: &BlobPath) -> Result<(u16, Option<u64>), StorageError> {
        match self.bucket.head_object(path.as_str()).await {
            Ok((head, status)) => {
                let length = head.content_length.and_then(|len| u64::try_from(len).ok());
                Ok((status, length))
            }
            Err(S3Error::HttpFailWithBody(404, _)) => Ok((404, None)),
            Err(e) => Err(backend_error(e)),
        }
    }
}

fn backend_error(err: S3Error) -> StorageError {
    StorageError::backend(BACKEND, err.to_string())
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn put(&self, path: &BlobPath, data: &[u8]) -> Result<(), StorageError> {
        ensure_within_limit(data.len(), self.max_size)?;

        let response = self
            .bucket
            .put_object_with_content_type(path.as_str(), data, &path.content_type())
            .await
            .map_err(backend_error)?;

        let status = response.status_code();
        if !is_success(status) {
            return Err(StorageError::backend(
                BACKEND,
                format!("PUT {path} returned HTTP {status}"),
            ));
        }
        Ok(())
    }

    async fn get(&self, path: &BlobPath) -> Result<Vec<u8>, StorageError> {
        let response = match self.bucket.get_object(path.as_str()).await {
            Ok(response) => response,
            Err(S3Error::HttpFailWithBody(404, _)) => {
                return Err(StorageError::NotFound(path.to_string()));
            }
            Err(e) => return Err(backend_error(e)),
        };

        match response.status_code() {
            404 => Err(StorageError::NotFound(path.to_string())),
            status if is_success(status) => Ok(response.bytes().to_vec()),
            status => Err(StorageError::backend(
                BACKEND,
                format!("GET {path} returned HTTP {status}"),
            )),
        }
    }

    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError> {
        match self.head_status(path).await? {
            (404, _) => Ok(false),
            (status, _) if is_success(status) => Ok(true),
            (status, _) => Err(StorageError::backend(
                BACKEND,
                format!("HEAD {path} returned HTTP {status}"),
            )),
        }
    }

    async fn delete(&self, path: &BlobPath) -> Result<bool, StorageError> {
        // S3 answers 204 whether or not the key existed.
        if !self.exists(path).await? {
            return Ok(false);
        }

        let response = self
            .bucket
            .delete_object(path.as_str())
            .await
            .map_err(backend_error)?;

        match response.status_code() {
            404 => Ok(false),
            status if is_success(status) => Ok(true),
            status => Err(StorageError::backend(
                BACKEND,
                format!("DELETE {path} returned HTTP {status}"),
            )),
        }
    }

    async fn size(&self, path: &BlobPath) -> Result<Option<u64>, StorageError> {
        match self.head_status(path).await? {
            (404, _) => Ok(None),
            (status, length) if is_success(status) => Ok(length),
            (status, _) => Err(StorageError::backend(
                BACKEND,
                format!("HEAD {path} returned HTTP {status}"),
            )),
        }
    }

    fn public_url(&self, path: &BlobPath) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), path),
            None => format!("{}/{}", self.bucket.url().trim_end_matches('/'), path),
        }
    }
}
