use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::storage::BlobPath;
use common::supabase::SupabaseError;
use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

/// A catalog product, independent of where it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: Option<Decimal>,
    pub image_path: Option<BlobPath>,
    pub active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Option<Decimal>,
    pub image_path: Option<BlobPath>,
    pub active: bool,
    pub display_order: i32,
    /// Creation time to record; `None` means now. Set when copying records.
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial update. Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Option<Decimal>>,
    pub image_path: Option<Option<BlobPath>>,
    pub active: Option<bool>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductFilter {
    pub active_only: bool,
}

#[derive(Debug, Default)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: u64,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Product {0} not found")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Remote catalog error: {0}")]
    Remote(#[from] SupabaseError),

    #[error("Invalid stored product: {0}")]
    InvalidRow(String),
}

/// Product persistence. Listings are ordered by `display_order` ascending,
/// then newest first. Pages are 1-based.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Short backend name for logs ("relational", "supabase").
    fn backend_name(&self) -> &'static str;

    async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<ProductPage, RepositoryError>;

    async fn get(&self, id: i64) -> Result<Option<Product>, RepositoryError>;

    async fn insert(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Apply `changes`; `RepositoryError::NotFound` when the product is gone.
    async fn update(&self, id: i64, changes: ProductChanges) -> Result<Product, RepositoryError>;

    /// Returns `false` when no product had this id.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

pub(crate) fn page_offset(page: u64, per_page: u64) -> u64 {
    page.max(1).saturating_sub(1).saturating_mul(per_page)
}
