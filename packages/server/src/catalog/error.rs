use common::storage::StorageError;
use thiserror::Error;

use super::repository::RepositoryError;
use crate::imaging::NormalizeError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product {0} not found")]
    NotFound(i64),

    /// The upload is not an accepted, decodable image.
    #[error("{0}")]
    InvalidImage(#[source] NormalizeError),

    #[error("Image upload is {actual} bytes; the limit is {limit} bytes")]
    UploadTooLarge { actual: u64, limit: u64 },

    /// Re-encoding failed and the failure policy is fail-closed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(#[source] NormalizeError),

    /// The blob store refused the blob because of its size limit.
    #[error("Image exceeds the storage quota: {0}")]
    Quota(#[source] StorageError),

    #[error("Image storage failed: {0}")]
    Storage(#[source] StorageError),

    #[error("No free image path for {0}")]
    PathUnavailable(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { .. } => Self::Quota(err),
            other => Self::Storage(other),
        }
    }
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            other => Self::Repository(other),
        }
    }
}
