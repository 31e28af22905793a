use crate::{
    error::{AppError, Result},
    models::summary::UpdateSummaryRequest,
    services::storage,
    state::AppState,
    utils::middleware::AuthUser,
};
use axum::{
    body::StreamBody,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::debug;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id", put(update_summary))
        .route("/:id", delete(delete_summary))
        .route("/:id/download", get(download_summary))
}

/// 更新摘要：表单里 title 与 file 都是可选项
/// PUT /api/summaries/:id
pub async fn update_summary(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(summary_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    debug!("User {} updating summary {}", user.id, summary_id);

    let mut title: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart request: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "title" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read title field: {}", e)))?;
                title = Some(value);
            }
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            _ => {}
        }
    }

    if title.is_none() && file.is_none() {
        return Err(AppError::bad_request("Nothing to update"));
    }

    let request = UpdateSummaryRequest {
        title: title.clone(),
    };
    request.validate().map_err(AppError::ValidatorError)?;

    let replacement = file
        .as_ref()
        .map(|(name, data)| (name.as_str(), data.as_slice()));
    let summary = app_state
        .summary_service
        .update_summary(&summary_id, title, replacement)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": summary.to_response()
    })))
}

/// 删除摘要
/// DELETE /api/summaries/:id
pub async fn delete_summary(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(summary_id): Path<String>,
) -> Result<StatusCode> {
    debug!("User {} deleting summary {}", user.id, summary_id);

    app_state.summary_service.delete_summary(&summary_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// 下载摘要（内联，不带附件头）
/// GET /api/summaries/:id/download
pub async fn download_summary(
    State(app_state): State<Arc<AppState>>,
    Path(summary_id): Path<String>,
) -> Result<impl IntoResponse> {
    let (file, size, summary) = app_state.summary_service.open_summary(&summary_id).await?;

    let stream = ReaderStream::new(file);
    let body = StreamBody::new(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        storage::content_type_for(&summary.file_path)
            .parse()
            .map_err(|_| AppError::internal("Failed to build response headers"))?,
    );
    headers.insert(
        header::CONTENT_LENGTH,
        size.to_string()
            .parse()
            .map_err(|_| AppError::internal("Failed to build response headers"))?,
    );

    Ok((headers, body))
}
