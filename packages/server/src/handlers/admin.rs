use axum::Json;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::{info, instrument, warn};

use crate::catalog::{ImageChange, NewProduct, ProductChanges, ProductFilter};
use crate::entity::{product_comment, product_vote};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::product::{
    ProductForm, ProductListResponse, ProductResponse, parse_bool, parse_price,
};
use crate::models::shared::{PageQuery, Pagination, validate_title};
use crate::state::AppState;

/// Allowance for multipart framing and the text fields on top of the image.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Room for a maximum-size image plus the text fields. Anything larger than
/// the image limit but inside this one reaches the handler and gets a
/// validation error naming the limit.
pub fn product_form_body_limit(max_upload_bytes: u64) -> DefaultBodyLimit {
    let limit = max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{context}: {}", e.body_text()))
    } else {
        AppError::Validation(format!("{context}: {}", e.body_text()))
    }
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| multipart_error(&format!("Failed to read '{name}'"), e))
}

/// Collect the product fields of a multipart body.
async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, AppError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Multipart error", e))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => form.title = Some(read_text(field, &name).await?),
            "description" => form.description = Some(read_text(field, &name).await?),
            "price" => form.price = Some(parse_price(&read_text(field, &name).await?)?),
            "active" => form.active = Some(parse_bool(&name, &read_text(field, &name).await?)?),
            "display_order" => {
                let raw = read_text(field, &name).await?;
                let order = raw.trim().parse::<i32>().map_err(|_| {
                    AppError::Validation(format!("display_order must be an integer, got '{raw}'"))
                })?;
                form.display_order = Some(order);
            }
            "remove_image" => {
                form.remove_image = parse_bool(&name, &read_text(field, &name).await?)?;
            }
            "image" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read image", e))?;
                // Browsers send an empty part when no file was chosen.
                if !data.is_empty() {
                    form.image = Some(data.to_vec());
                }
            }
            _ => {} // Ignore unknown fields.
        }
    }

    if let Some(title) = &form.title {
        validate_title(title)?;
    }
    if form.remove_image && form.image.is_some() {
        return Err(AppError::Validation(
            "Send either an image or remove_image, not both".into(),
        ));
    }

    Ok(form)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Admin",
    operation_id = "listAllProducts",
    summary = "List all products",
    description = "Same ordering as the public listing, including inactive products. Staff only.",
    params(PageQuery),
    responses(
        (status = 200, description = "Product page", body = ProductListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_all_products(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProductListResponse>, AppError> {
    auth_user.require_staff()?;

    let (page, per_page) = query.resolve(state.config.catalog.page_size);
    let result = state
        .catalog
        .repository()
        .list(ProductFilter { active_only: false }, page, per_page)
        .await?;

    let blobs = state.blob_store.as_ref();
    Ok(Json(ProductListResponse {
        data: result
            .items
            .into_iter()
            .map(|p| ProductResponse::new(p, blobs))
            .collect(),
        pagination: Pagination::new(page, per_page, result.total),
        degraded: false,
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Admin",
    operation_id = "createProduct",
    summary = "Create a product",
    description = "Multipart form with `title` (required), `description`, `price`, `active`, \
        `display_order` and an optional `image` file. The image is re-encoded to fit the \
        configured size ceiling and stored under `productos/`. Staff only.",
    request_body(content_type = "multipart/form-data", description = "Product fields and optional image"),
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 413, description = "Body over the form limit or rejected by the blob store (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn create_product(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_staff()?;

    let form = read_product_form(multipart).await?;
    let title = form
        .title
        .ok_or_else(|| AppError::Validation("Missing 'title' field".into()))?;

    let new_product = NewProduct {
        title: title.trim().to_string(),
        description: form.description.unwrap_or_default(),
        price: form.price.flatten(),
        image_path: None,
        active: form.active.unwrap_or(true),
        display_order: form.display_order.unwrap_or(0),
        created_at: None,
    };

    let product = state.catalog.create(new_product, form.image).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::new(product, state.blob_store.as_ref())),
    ))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Admin",
    operation_id = "updateProduct",
    summary = "Update a product",
    description = "Multipart form; only the fields sent are changed. An empty `price` clears it. \
        A new `image` replaces the stored one and `remove_image=true` clears it; the previous \
        image is deleted once the product is saved. Staff only.",
    params(("id" = i64, Path, description = "Product ID")),
    request_body(content_type = "multipart/form-data", description = "Changed product fields"),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "Body over the form limit or rejected by the blob store (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id))]
pub async fn update_product(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ProductResponse>, AppError> {
    auth_user.require_staff()?;

    let form = read_product_form(multipart).await?;

    let changes = ProductChanges {
        title: form.title.map(|t| t.trim().to_string()),
        description: form.description,
        price: form.price,
        image_path: None,
        active: form.active,
        display_order: form.display_order,
    };
    let image = match (form.image, form.remove_image) {
        (Some(data), _) => ImageChange::Replace(data),
        (None, true) => ImageChange::Remove,
        (None, false) => ImageChange::Keep,
    };

    let product = state.catalog.update(id, changes, image).await?;
    Ok(Json(ProductResponse::new(product, state.blob_store.as_ref())))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Admin",
    operation_id = "deleteProduct",
    summary = "Delete a product",
    description = "Deletes the product, then its image, votes and comments. Staff only.",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_product(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth_user.require_staff()?;

    state.catalog.delete(id).await?;

    // Once the product is gone, a failed cleanup does not fail the request.
    match remove_feedback(&state.db, id).await {
        Ok((votes, comments)) => info!(votes, comments, "Removed product feedback"),
        Err(e) => warn!(error = %e, "Product deleted but its feedback was kept"),
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Delete the votes and comments of a product together. Returns the row
/// counts.
async fn remove_feedback(db: &DatabaseConnection, product_id: i64) -> Result<(u64, u64), DbErr> {
    let txn = db.begin().await?;
    let votes = product_vote::Entity::delete_many()
        .filter(product_vote::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    let comments = product_comment::Entity::delete_many()
        .filter(product_comment::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;
    Ok((votes.rows_affected, comments.rows_affected))
}
