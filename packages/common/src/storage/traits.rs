use async_trait::async_trait;

use super::error::StorageError;
use super::path::BlobPath;

/// Path-addressed blob storage.
///
/// All backends share the same semantics: `put` overwrites, and `delete` or
/// `size` on a missing path are not errors.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name for logs ("filesystem", "s3", "supabase").
    fn backend_name(&self) -> &'static str;

    /// Store bytes at `path`, replacing any previous blob there.
    async fn put(&self, path: &BlobPath, data: &[u8]) -> Result<(), StorageError>;

    /// Retrieve all bytes of a blob. Missing blobs yield `StorageError::NotFound`.
    async fn get(&self, path: &BlobPath) -> Result<Vec<u8>, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, path: &BlobPath) -> Result<bool, StorageError>;

    /// Size of a blob in bytes, or `None` when it does not exist.
    async fn size(&self, path: &BlobPath) -> Result<Option<u64>, StorageError>;

    /// URL under which clients can fetch the blob.
    fn public_url(&self, path: &BlobPath) -> String;
}
