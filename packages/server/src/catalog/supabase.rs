use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::storage::BlobPath;
use common::supabase::SupabaseClient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::repository::{
    NewProduct, Product, ProductChanges, ProductFilter, ProductPage, ProductRepository,
    RepositoryError, page_offset,
};

/// Marker preceding the object path in legacy public-URL `foto_url` values.
const LEGACY_URL_MARKER: &str = "/productos/";

/// A row of the remote `productos` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProductRow {
    id: i64,
    titulo: String,
    descripcion: Option<String>,
    precio: Option<Decimal>,
    foto_url: Option<String>,
    activo: bool,
    orden: i32,
    fecha_creacion: DateTime<Utc>,
    fecha_actualizacion: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    titulo: &'a str,
    descripcion: &'a str,
    precio: Option<Decimal>,
    foto_url: Option<&'a str>,
    activo: bool,
    orden: i32,
    fecha_creacion: DateTime<Utc>,
    fecha_actualizacion: DateTime<Utc>,
}

/// PATCH body; absent fields are left untouched by PostgREST.
#[derive(Debug, Default, Serialize)]
struct UpdateRow<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    titulo: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    descripcion: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    precio: Option<Option<Decimal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    foto_url: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    activo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orden: Option<i32>,
    fecha_actualizacion: DateTime<Utc>,
}

/// Extract the blob path from a stored `foto_url`.
///
/// Newer rows store the bare path; older rows stored a full public URL ending
/// in `.../productos/<file>`.
fn image_path_from_column(value: &str) -> Result<BlobPath, String> {
    let path = if value.starts_with("http://") || value.starts_with("https://") {
        let (_, file) = value
            .rsplit_once(LEGACY_URL_MARKER)
            .ok_or_else(|| format!("unrecognised image URL {value}"))?;
        format!("productos/{file}")
    } else {
        value.to_string()
    };
    BlobPath::parse(&path).map_err(|e| e.to_string())
}

/// `NUMERIC(10,2)` arrives as a JSON float; restore the fixed scale.
fn two_places(mut price: Decimal) -> Decimal {
    price.rescale(2);
    price
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let image_path = row
            .foto_url
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(image_path_from_column)
            .transpose()
            .map_err(|e| RepositoryError::InvalidRow(format!("product {}: {e}", row.id)))?;

        Ok(Product {
            id: row.id,
            title: row.titulo,
            description: row.descripcion.unwrap_or_default(),
            price: row.precio.map(two_places),
            image_path,
            active: row.activo,
            display_order: row.orden,
            created_at: row.fecha_creacion,
            updated_at: row.fecha_actualizacion.unwrap_or(row.fecha_creacion),
        })
    }
}

/// Products stored in a Supabase table through PostgREST.
pub struct SupabaseProductRepository {
    client: SupabaseClient,
    table: String,
}

impl SupabaseProductRepository {
    pub fn new(client: SupabaseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl ProductRepository for SupabaseProductRepository {
    fn backend_name(&self) -> &'static str {
        "supabase"
    }

    async fn list(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<ProductPage, RepositoryError> {
        let mut query = vec![("order", "orden.asc,fecha_creacion.desc,id.desc".to_string())];
        if filter.active_only {
            query.push(("activo", "eq.true".to_string()));
        }

        let page_rows = self
            .client
            .select_page::<ProductRow>(&self.table, &query, page_offset(page, per_page), per_page)
            .await?;

        let items = page_rows
            .rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let total = page_rows
            .total
            .unwrap_or_else(|| page_offset(page, per_page) + items.len() as u64);

        Ok(ProductPage { items, total })
    }

    async fn get(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = self
            .client
            .select(&self.table, &[("id", format!("eq.{id}"))])
            .await?;
        rows.into_iter().next().map(Product::try_from).transpose()
    }

    async fn insert(&self, new: NewProduct) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let body = InsertRow {
            titulo: &new.title,
            descripcion: &new.description,
            precio: new.price,
            foto_url: new.image_path.as_ref().map(BlobPath::as_str),
            activo: new.active,
            orden: new.display_order,
            fecha_creacion: new.created_at.unwrap_or(now),
            fecha_actualizacion: now,
        };
        let row: ProductRow = self.client.insert(&self.table, &body).await?;
        row.try_into()
    }

    async fn update(&self, id: i64, changes: ProductChanges) -> Result<Product, RepositoryError> {
        let body = UpdateRow {
            titulo: changes.title.as_deref(),
            descripcion: changes.description.as_deref(),
            precio: changes.price,
            foto_url: changes
                .image_path
                .as_ref()
                .map(|path| path.as_ref().map(BlobPath::as_str)),
            activo: changes.active,
            orden: changes.display_order,
            fecha_actualizacion: Utc::now(),
        };

        let row: Option<ProductRow> = self.client.update_by_id(&self.table, id, &body).await?;
        row.ok_or(RepositoryError::NotFound(id))?.try_into()
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.client.delete_by_id(&self.table, id).await?)
    }
}
