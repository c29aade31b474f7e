mod error;
mod path;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;
pub mod supabase;

use std::sync::Arc;

pub use error::StorageError;
pub use filesystem::FilesystemBlobStore;
pub use path::BlobPath;
pub use traits::BlobStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::supabase::SupabaseClient;

/// Build the blob store selected by `config.backend`.
///
/// The Supabase backend reuses the caller's client so the product repository
/// and the bucket share one connection pool.
pub async fn open_blob_store(
    config: &StorageConfig,
    supabase: Option<(&SupabaseClient, &str)>,
) -> Result<Arc<dyn BlobStore>, StorageError> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Local => Arc::new(
            FilesystemBlobStore::new(
                config.local.base_path.clone(),
                config.local.public_base_url.clone(),
                config.max_blob_size,
            )
            .await?,
        ),
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => {
            let s3_config = config.s3.as_ref().ok_or_else(|| {
                StorageError::Misconfigured("backend = \"s3\" requires a [storage.s3] section".into())
            })?;
            Arc::new(s3::S3BlobStore::new(s3_config, config.max_blob_size)?)
        }
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => {
            return Err(StorageError::Misconfigured(
                "built without the object-storage feature".into(),
            ));
        }
        StorageBackend::Supabase => {
            let (client, bucket) = supabase.ok_or_else(|| {
                StorageError::Misconfigured(
                    "backend = \"supabase\" requires a [supabase] section".into(),
                )
            })?;
            Arc::new(supabase::SupabaseBlobStore::new(
                client.clone(),
                bucket,
                config.max_blob_size,
            ))
        }
    };

    tracing::info!(backend = store.backend_name(), "Blob store ready");
    Ok(store)
}
