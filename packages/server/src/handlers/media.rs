use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use common::storage::BlobPath;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/media/{path}",
    tag = "Media",
    operation_id = "getMedia",
    summary = "Download a stored blob",
    description = "Serves product images from the configured blob store.",
    params(("path" = String, Path, description = "Blob path, e.g. `productos/pan_imagen.jpg`")),
    responses(
        (status = 200, description = "Blob bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid path (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Blob not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let path = BlobPath::parse(&path)?;
    let data = state.blob_store.get(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, path.content_type()),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        data,
    ))
}
