use async_trait::async_trait;

use super::error::{StorageError, ensure_within_limit};
use super::path::BlobPath;
use super::traits::BlobStore;
use crate::supabase::{SupabaseClient, SupabaseError};

const BACKEND: &str = "supabase";

/// Blob store backed by a Supabase storage bucket.
pub struct SupabaseBlobStore {
    client: SupabaseClient,
    bucket: String,
    max_size: u64,
}

impl SupabaseBlobStore {
    pub fn new(client: SupabaseClient, bucket: impl Into<String>, max_size: u64) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            max_size,
        }
    }
}

/// Supabase Storage only accepts ASCII object keys. Accented Spanish letters
/// fold to their base letter and any other non-ASCII character becomes `_`.
/// Every operation goes through this mapping, so two paths that fold to the
/// same key are the same object.
fn object_key(path: &BlobPath) -> String {
    path.as_str()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            'ñ' => 'n',
            'Ñ' => 'N',
            c if c.is_ascii() => c,
            _ => '_',
        })
        .collect()
}

fn backend_error(err: SupabaseError) -> StorageError {
    StorageError::backend(BACKEND, err.to_string())
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn put(&self, path: &BlobPath, data: &[u8]) -> Result<(), StorageError> {
        ensure_within_limit(data.len(), self.max_size)?;
        self.client
            .upload_object(&self.bucket, &object_key(path), data.to_vec(), &path.content_type())
            .await
            .map_err(backend_error)
    }

    async fn get(&self, path: &BlobPath) -> Result<Vec<u8>, StorageError> {
        match self.client.download_object(&self.bucket, &object_key(path)).await {
            Ok(data) => Ok(data),
            Err(e) if e.is_not_found() => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn exists(&self, path: &BlobPath) -> Result<bool, StorageError> {
        Ok(self.size(path).await?.is_some())
    }

    async fn delete(&self, path: &BlobPath) -> Result<bool, StorageError> {
        self.client
            .delete_object(&self.bucket, &object_key(path))
            .await
            .map_err(backend_error)
    }

    async fn size(&self, path: &BlobPath) -> Result<Option<u64>, StorageError> {
        self.client
            .object_size(&self.bucket, &object_key(path))
            .await
            .map_err(backend_error)
    }

    fn public_url(&self, path: &BlobPath) -> String {
        self.client.public_object_url(&self.bucket, &object_key(path))
    }
}
