use std::sync::Arc;

use anyhow::Context;
use common::storage::{BlobStore, open_blob_store};
use common::supabase::SupabaseClient;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::catalog::{
    CatalogService, ProductRepository, RelationalProductRepository, SupabaseProductRepository,
};
use crate::config::{AppConfig, CatalogBackend};
use crate::imaging::{ImageNormalizer, NormalizerSettings};

#[derive(Clone)]
pub struct AppState {
    /// Users, votes and comments. Also products with the relational backend.
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub blob_store: Arc<dyn BlobStore>,
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    /// Assemble state from already constructed backends.
    pub fn build(
        config: AppConfig,
        db: DatabaseConnection,
        blob_store: Arc<dyn BlobStore>,
        repository: Arc<dyn ProductRepository>,
    ) -> Self {
        let image = &config.catalog.image;
        let normalizer = ImageNormalizer::new(NormalizerSettings {
            max_bytes: image.max_bytes,
            max_width: image.max_width,
            max_height: image.max_height,
        });
        let catalog = CatalogService::new(
            repository,
            blob_store.clone(),
            Arc::new(normalizer),
            image.failure_policy,
            image.max_upload_bytes,
        );

        Self {
            db,
            config: Arc::new(config),
            blob_store,
            catalog: Arc::new(catalog),
        }
    }

    /// Construct the blob store and product repository selected by `config`.
    ///
    /// One Supabase client is shared by both when either uses it.
    pub async fn from_config(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        let supabase = match (&config.supabase, config.uses_supabase()) {
            (Some(section), true) => Some(
                SupabaseClient::new(section).context("Failed to build Supabase client")?,
            ),
            (None, true) => anyhow::bail!("a [supabase] section is required by the configured backends"),
            (_, false) => None,
        };

        let bucket = config.supabase.as_ref().map(|s| s.bucket.as_str());
        let blob_store = open_blob_store(
            &config.storage,
            supabase.as_ref().zip(bucket),
        )
        .await
        .context("Failed to open blob store")?;

        let repository: Arc<dyn ProductRepository> = match config.catalog.backend {
            CatalogBackend::Relational => Arc::new(RelationalProductRepository::new(db.clone())),
            CatalogBackend::Supabase => {
                let client = supabase
                    .clone()
                    .context("Supabase catalog backend without a client")?;
                let table = config
                    .supabase
                    .as_ref()
                    .map(|s| s.products_table.clone())
                    .context("Supabase catalog backend without a [supabase] section")?;
                Arc::new(SupabaseProductRepository::new(client, table))
            }
        };

        info!(
            catalog = repository.backend_name(),
            storage = blob_store.backend_name(),
            "Catalog backends ready"
        );

        Ok(Self::build(config, db, blob_store, repository))
    }
}
