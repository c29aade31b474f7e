use chrono::{DateTime, Utc};
use common::storage::BlobStore;
use rust_decimal::Decimal;
use serde::Serialize;

use super::shared::Pagination;
use crate::catalog::Product;
use crate::error::AppError;

/// Largest accepted price, in cents (99 999 999.99).
const MAX_PRICE_CENTS: i64 = 9_999_999_999;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProductResponse {
    #[schema(example = 12)]
    pub id: i64,
    #[schema(example = "Figura Gundam Azul")]
    pub title: String,
    pub description: String,
    /// Price as a two-decimal string, or null when unlisted.
    #[schema(example = "10.00")]
    pub price: Option<Decimal>,
    /// Blob path of the image.
    #[schema(example = "productos/figura-gundam-azul_imagen.jpg")]
    pub image_path: Option<String>,
    /// URL clients can load the image from.
    #[schema(example = "/media/productos/figura-gundam-azul_imagen.jpg")]
    pub image_url: Option<String>,
    pub active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    pub fn new(product: Product, blobs: &dyn BlobStore) -> Self {
        let image_url = product.image_path.as_ref().map(|p| blobs.public_url(p));
        Self {
            id: product.id,
            title: product.title,
            description: product.description,
            price: product.price,
            image_path: product.image_path.map(|p| p.as_str().to_string()),
            image_url,
            active: product.active,
            display_order: product.display_order,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProductListResponse {
    pub data: Vec<ProductResponse>,
    pub pagination: Pagination,
    /// The catalog store could not be read; `data` is empty.
    pub degraded: bool,
}

/// Fields parsed from the admin multipart form.
///
/// `None` means the field was not sent.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` when sent empty, which clears the price.
    pub price: Option<Option<Decimal>>,
    pub active: Option<bool>,
    pub display_order: Option<i32>,
    pub image: Option<Vec<u8>>,
    pub remove_image: bool,
}

/// Parse and validate a price field: non-negative, at most two decimals.
pub fn parse_price(raw: &str) -> Result<Option<Decimal>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let price: Decimal = raw
        .replace(',', ".")
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid price '{raw}'")))?;

    if price.is_sign_negative() {
        return Err(AppError::Validation("Price must not be negative".into()));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::Validation(
            "Price must have at most 2 decimal places".into(),
        ));
    }
    let max_price = Decimal::new(MAX_PRICE_CENTS, 2);
    if price > max_price {
        return Err(AppError::Validation(format!(
            "Price must not exceed {max_price}"
        )));
    }

    let mut price = price;
    price.rescale(2);
    Ok(Some(price))
}

/// Parse a checkbox-style boolean form field.
pub fn parse_bool(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "{name} must be true or false"
        ))),
    }
}
