use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::Pagination;
use crate::entity::product_comment;
use crate::error::AppError;

/// Request body for posting a comment.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CommentRequest {
    #[serde(alias = "texto")]
    #[schema(example = "¡Llegó perfecto y muy bien empacado!")]
    pub text: String,
}

/// Trim and length-check a comment body.
pub fn validate_comment_text(text: &str, max_length: usize) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment must not be empty".into()));
    }
    if text.chars().count() > max_length {
        return Err(AppError::Validation(format!(
            "Comment must be at most {max_length} characters"
        )));
    }
    Ok(text.to_string())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    #[schema(example = 7)]
    pub id: i64,
    pub product_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Whether the caller may delete this comment.
    pub can_delete: bool,
}

impl CommentResponse {
    pub fn new(comment: product_comment::Model, viewer: &str, viewer_is_staff: bool) -> Self {
        Self {
            can_delete: viewer_is_staff || comment.client_id == viewer,
            id: comment.id,
            product_id: comment.product_id,
            text: comment.text,
            created_at: comment.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentListResponse {
    pub data: Vec<CommentResponse>,
    pub pagination: Pagination,
}
