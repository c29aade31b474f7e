use std::sync::Arc;

use common::storage::{BlobPath, BlobStore};
use rand::Rng;
use tracing::{debug, info, warn};

use super::error::CatalogError;
use super::repository::{NewProduct, Product, ProductChanges, ProductRepository};
use crate::config::ImageFailurePolicy;
use crate::imaging::{ImageProcessor, OUTPUT_EXTENSION, sniff_format};
use crate::utils::filename::slugify;

/// Blob namespace for product images.
const IMAGE_PREFIX: &str = "productos";
/// Fixed filename suffix placed before the extension.
const IMAGE_SUFFIX: &str = "_imagen";
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;
const MAX_PATH_ATTEMPTS: usize = 10;

/// What an update does to the product image.
#[derive(Debug, Default)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(Vec<u8>),
    Remove,
}

/// Product create/update/delete with image handling.
///
/// Ordering guarantees: a new image is stored before the record that points to
/// it is persisted, and an old image is removed only after the record no longer
/// points to it.
pub struct CatalogService {
    repository: Arc<dyn ProductRepository>,
    blobs: Arc<dyn BlobStore>,
    normalizer: Arc<dyn ImageProcessor>,
    failure_policy: ImageFailurePolicy,
    max_upload_bytes: u64,
}

impl CatalogService {
    pub fn new(
        repository: Arc<dyn ProductRepository>,
        blobs: Arc<dyn BlobStore>,
        normalizer: Arc<dyn ImageProcessor>,
        failure_policy: ImageFailurePolicy,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            repository,
            blobs,
            normalizer,
            failure_policy,
            max_upload_bytes,
        }
    }

    pub fn repository(&self) -> &Arc<dyn ProductRepository> {
        &self.repository
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Create a product, storing `image` first when given.
    pub async fn create(
        &self,
        mut product: NewProduct,
        image: Option<Vec<u8>>,
    ) -> Result<Product, CatalogError> {
        let stored = match image {
            Some(data) => Some(self.store_image(&product.title, data).await?),
            None => None,
        };
        product.image_path = stored.clone();

        match self.repository.insert(product).await {
            Ok(created) => {
                info!(product_id = created.id, image = ?created.image_path, "Product created");
                Ok(created)
            }
            Err(e) => {
                if let Some(path) = &stored {
                    self.discard_blob(path, "insert failed").await;
                }
                Err(e.into())
            }
        }
    }

    /// Apply `changes` and `image` to an existing product.
    pub async fn update(
        &self,
        id: i64,
        mut changes: ProductChanges,
        image: ImageChange,
    ) -> Result<Product, CatalogError> {
        let existing = self
            .repository
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        let stored = match image {
            ImageChange::Keep => {
                changes.image_path = None;
                None
            }
            ImageChange::Replace(data) => {
                let title = changes.title.as_deref().unwrap_or(&existing.title);
                let path = self.store_image(title, data).await?;
                changes.image_path = Some(Some(path.clone()));
                Some(path)
            }
            ImageChange::Remove => {
                changes.image_path = Some(None);
                None
            }
        };
        let image_changed = changes.image_path.is_some();

        let updated = match self.repository.update(id, changes).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(path) = &stored {
                    self.discard_blob(path, "update failed").await;
                }
                return Err(e.into());
            }
        };

        if image_changed
            && let Some(previous) = &existing.image_path
            && updated.image_path.as_ref() != Some(previous)
        {
            self.discard_blob(previous, "image replaced").await;
        }

        info!(product_id = id, image = ?updated.image_path, "Product updated");
        Ok(updated)
    }

    /// Delete a product, then its image. Returns the deleted product.
    pub async fn delete(&self, id: i64) -> Result<Product, CatalogError> {
        let existing = self
            .repository
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        if !self.repository.delete(id).await? {
            return Err(CatalogError::NotFound(id));
        }

        if let Some(path) = &existing.image_path {
            self.discard_blob(path, "product deleted").await;
        }

        info!(product_id = id, "Product deleted");
        Ok(existing)
    }

    /// Normalize `data` and put it under a fresh path derived from `title`.
    async fn store_image(&self, title: &str, data: Vec<u8>) -> Result<BlobPath, CatalogError> {
        let actual = data.len() as u64;
        if actual > self.max_upload_bytes {
            return Err(CatalogError::UploadTooLarge {
                actual,
                limit: self.max_upload_bytes,
            });
        }

        let original: Arc<[u8]> = data.into();
        let (bytes, extension) = match self.normalizer.normalize(original.clone()).await {
            Ok(image) => {
                debug!(
                    size = image.data.len(),
                    width = image.width,
                    height = image.height,
                    quality = image.quality,
                    floor_reached = image.floor_reached,
                    "Image normalized"
                );
                (image.data, OUTPUT_EXTENSION)
            }
            Err(e) if e.is_validation() => return Err(CatalogError::InvalidImage(e)),
            Err(e) => match self.failure_policy {
                ImageFailurePolicy::FailClosed => return Err(CatalogError::ImageProcessing(e)),
                ImageFailurePolicy::FailOpen => {
                    let extension = sniff_format(&original)
                        .and_then(|format| format.extensions_str().first().copied())
                        .unwrap_or("bin");
                    debug!(error = %e, extension, "Normalization failed, storing original upload");
                    (original.to_vec(), extension)
                }
            },
        };

        let path = self.allocate_image_path(title, extension).await?;
        self.blobs.put(&path, &bytes).await?;
        Ok(path)
    }

    /// `productos/{slug}_imagen.{ext}`, or `productos/{slug}-{random}_imagen.{ext}`
    /// when taken.
    async fn allocate_image_path(
        &self,
        title: &str,
        extension: &str,
    ) -> Result<BlobPath, CatalogError> {
        let slug = slugify(title);

        let preferred = image_path(&slug, extension)?;
        if !self.blobs.exists(&preferred).await? {
            return Ok(preferred);
        }

        for _ in 0..MAX_PATH_ATTEMPTS {
            let candidate = image_path(&format!("{slug}-{}", random_suffix()), extension)?;
            if !self.blobs.exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(CatalogError::PathUnavailable(preferred.to_string()))
    }

    /// Best-effort blob removal; the record change it follows has already
    /// been persisted.
    async fn discard_blob(&self, path: &BlobPath, reason: &str) {
        match self.blobs.delete(path).await {
            Ok(deleted) => debug!(%path, deleted, reason, "Discarded product image"),
            Err(e) => warn!(%path, reason, error = %e, "Failed to delete product image"),
        }
    }
}

fn image_path(stem: &str, extension: &str) -> Result<BlobPath, CatalogError> {
    Ok(BlobPath::parse(&format!(
        "{IMAGE_PREFIX}/{stem}{IMAGE_SUFFIX}.{extension}"
    ))?)
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}
