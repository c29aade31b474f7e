use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use sea_orm::*;
use tracing::{debug, instrument, warn};

use super::product::find_active_product;
use crate::entity::product_vote;
use crate::error::{AppError, ErrorBody};
use crate::extractors::identity::ClientIdentity;
use crate::extractors::json::AppJson;
use crate::models::vote::{VoteKind, VoteRequest, VoteSummary};
use crate::state::AppState;

async fn current_vote<C: ConnectionTrait>(
    db: &C,
    product_id: i64,
    client: &ClientIdentity,
) -> Result<Option<product_vote::Model>, DbErr> {
    product_vote::Entity::find_by_id((product_id, client.key().to_string()))
        .one(db)
        .await
}

async fn summarize<C: ConnectionTrait>(
    db: &C,
    product_id: i64,
    current: Option<VoteKind>,
) -> Result<VoteSummary, DbErr> {
    let count = |kind: VoteKind| {
        product_vote::Entity::find()
            .filter(product_vote::Column::ProductId.eq(product_id))
            .filter(product_vote::Column::Kind.eq(kind.as_str()))
            .count(db)
    };

    Ok(VoteSummary {
        likes: count(VoteKind::Like).await?,
        dislikes: count(VoteKind::Dislike).await?,
        current_vote: current,
    })
}

/// Kind of a stored vote. Unknown values are treated as no vote.
fn stored_kind(vote: &product_vote::Model) -> Option<VoteKind> {
    match vote.kind.parse() {
        Ok(kind) => Some(kind),
        Err(e) => {
            warn!(product_id = vote.product_id, client = %vote.client_id, "{e}");
            None
        }
    }
}

#[utoipa::path(
    post,
    path = "/{id}/votes",
    tag = "Votes",
    operation_id = "castVote",
    summary = "Like or dislike a product",
    description = "The first vote is recorded. Voting the other kind switches the vote. Voting the \
        same kind again removes it. Anonymous clients are identified by address.",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote totals after the change", body = VoteSummary),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Concurrent vote from the same client (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, client, payload), fields(product_id, client = %client))]
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    client: ClientIdentity,
    AppJson(payload): AppJson<VoteRequest>,
) -> Result<Json<VoteSummary>, AppError> {
    find_active_product(&state, product_id).await?;

    let now = Utc::now();
    let existing = current_vote(&state.db, product_id, &client).await?;

    let current = match existing {
        None => {
            let vote = product_vote::ActiveModel {
                product_id: Set(product_id),
                client_id: Set(client.key().to_string()),
                kind: Set(payload.kind.as_str().to_string()),
                created_at: Set(now),
                updated_at: Set(now),
            };
            product_vote::Entity::insert(vote)
                .exec_without_returning(&state.db)
                .await
                .map_err(|e| match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        AppError::Conflict("A vote from this client is already being recorded".into())
                    }
                    _ => AppError::from(e),
                })?;
            debug!(kind = %payload.kind, "Vote recorded");
            Some(payload.kind)
        }
        Some(vote) if stored_kind(&vote) == Some(payload.kind) => {
            vote.delete(&state.db).await?;
            debug!(kind = %payload.kind, "Vote withdrawn");
            None
        }
        Some(vote) => {
            let mut active: product_vote::ActiveModel = vote.into();
            active.kind = Set(payload.kind.as_str().to_string());
            active.updated_at = Set(now);
            active.update(&state.db).await?;
            debug!(kind = %payload.kind, "Vote changed");
            Some(payload.kind)
        }
    };

    Ok(Json(summarize(&state.db, product_id, current).await?))
}

#[utoipa::path(
    get,
    path = "/{id}/votes",
    tag = "Votes",
    operation_id = "getVotes",
    summary = "Vote totals for a product",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Vote totals and the caller's vote", body = VoteSummary),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, client), fields(product_id, client = %client))]
pub async fn get_votes(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    client: ClientIdentity,
) -> Result<Json<VoteSummary>, AppError> {
    find_active_product(&state, product_id).await?;

    let current = current_vote(&state.db, product_id, &client)
        .await?
        .as_ref()
        .and_then(stored_kind);

    Ok(Json(summarize(&state.db, product_id, current).await?))
}
