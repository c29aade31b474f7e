use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Days, Utc};
use sea_orm::*;
use tracing::{info, instrument};

use super::product::find_active_product;
use crate::entity::product_comment;
use crate::error::{AppError, ErrorBody};
use crate::extractors::identity::ClientIdentity;
use crate::extractors::json::AppJson;
use crate::models::comment::{
    CommentListResponse, CommentRequest, CommentResponse, validate_comment_text,
};
use crate::models::shared::{PageQuery, Pagination};
use crate::state::AppState;

/// Start of the UTC calendar day containing `now`, and of the next one.
fn utc_day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
    let next = start.checked_add_days(Days::new(1)).unwrap_or(start);
    (start, next)
}

#[utoipa::path(
    get,
    path = "/{id}/comments",
    tag = "Comments",
    operation_id = "listComments",
    summary = "List comments on a product",
    description = "Newest first. `can_delete` tells whether the caller may delete each comment.",
    params(("id" = i64, Path, description = "Product ID"), PageQuery),
    responses(
        (status = 200, description = "Comment page", body = CommentListResponse),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, client, query), fields(product_id))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    client: ClientIdentity,
    Query(query): Query<PageQuery>,
) -> Result<Json<CommentListResponse>, AppError> {
    find_active_product(&state, product_id).await?;

    let (page, per_page) = query.resolve(state.config.comments.page_size);

    let paginator = product_comment::Entity::find()
        .filter(product_comment::Column::ProductId.eq(product_id))
        .order_by_desc(product_comment::Column::CreatedAt)
        .order_by_desc(product_comment::Column::Id)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let comments = paginator.fetch_page(page - 1).await?;

    Ok(Json(CommentListResponse {
        data: comments
            .into_iter()
            .map(|c| CommentResponse::new(c, client.key(), client.is_staff()))
            .collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/comments",
    tag = "Comments",
    operation_id = "createComment",
    summary = "Comment on a product",
    description = "Each client may post one comment per product per UTC calendar day.",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty or too long (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
        (status = 429, description = "Already commented today (RATE_LIMITED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, client, payload), fields(product_id, client = %client))]
pub async fn create_comment(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    client: ClientIdentity,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = validate_comment_text(&payload.text, state.config.comments.max_length)?;
    find_active_product(&state, product_id).await?;

    let now = Utc::now();
    let (today, tomorrow) = utc_day_bounds(now);

    let already_posted = product_comment::Entity::find()
        .filter(product_comment::Column::ProductId.eq(product_id))
        .filter(product_comment::Column::ClientId.eq(client.key()))
        .filter(product_comment::Column::CreatedAt.gte(today))
        .count(&state.db)
        .await?;
    if already_posted > 0 {
        return Err(AppError::RateLimited {
            retry_after: std::cmp::Ord::max((tomorrow - now).num_seconds(), 1) as u64,
            message: "You already commented on this product today. Try again tomorrow.".into(),
        });
    }

    let comment = product_comment::ActiveModel {
        product_id: Set(product_id),
        client_id: Set(client.key().to_string()),
        text: Set(text),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(comment_id = comment.id, "Comment created");

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::new(comment, client.key(), client.is_staff())),
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}/comments/{comment_id}",
    tag = "Comments",
    operation_id = "deleteComment",
    summary = "Delete a comment",
    description = "Allowed for the client that posted it and for staff.",
    params(
        ("id" = i64, Path, description = "Product ID"),
        ("comment_id" = i64, Path, description = "Comment ID"),
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, client), fields(product_id, comment_id, client = %client))]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((product_id, comment_id)): Path<(i64, i64)>,
    client: ClientIdentity,
) -> Result<StatusCode, AppError> {
    let comment = product_comment::Entity::find_by_id(comment_id)
        .filter(product_comment::Column::ProductId.eq(product_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;

    if comment.client_id != client.key() && !client.is_staff() {
        return Err(AppError::PermissionDenied);
    }

    comment.delete(&state.db).await?;
    info!("Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}
