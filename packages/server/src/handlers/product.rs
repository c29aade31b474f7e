use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::{instrument, warn};

use crate::catalog::{Product, ProductFilter};
use crate::error::{AppError, ErrorBody};
use crate::models::product::{ProductListResponse, ProductResponse};
use crate::models::shared::{PageQuery, Pagination};
use crate::state::AppState;

/// Active product by id, or `NOT_FOUND`. Inactive products are hidden from
/// the public API.
pub(crate) async fn find_active_product(state: &AppState, id: i64) -> Result<Product, AppError> {
    state
        .catalog
        .repository()
        .get(id)
        .await?
        .filter(|p| p.active)
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Products",
    operation_id = "listProducts",
    summary = "List active products",
    description = "Returns active products ordered by `display_order` ascending, newest first within \
        the same order. When the catalog store cannot be read the response is still 200 with an \
        empty page and `degraded: true`.",
    params(PageQuery),
    responses(
        (status = 200, description = "Product page", body = ProductListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Json<ProductListResponse> {
    let (page, per_page) = query.resolve(state.config.catalog.page_size);
    let repository = state.catalog.repository();

    match repository
        .list(ProductFilter { active_only: true }, page, per_page)
        .await
    {
        Ok(result) => {
            let blobs = state.blob_store.as_ref();
            Json(ProductListResponse {
                data: result
                    .items
                    .into_iter()
                    .map(|p| ProductResponse::new(p, blobs))
                    .collect(),
                pagination: Pagination::new(page, per_page, result.total),
                degraded: false,
            })
        }
        Err(e) => {
            warn!(backend = repository.backend_name(), error = %e, "Product listing degraded");
            Json(ProductListResponse {
                data: Vec::new(),
                pagination: Pagination::new(page, per_page, 0),
                degraded: true,
            })
        }
    }
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    operation_id = "getProduct",
    summary = "Get an active product",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = ProductResponse),
        (status = 404, description = "Product not found or inactive (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = find_active_product(&state, id).await?;
    Ok(Json(ProductResponse::new(product, state.blob_store.as_ref())))
}
