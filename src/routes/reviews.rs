use crate::{
    error::Result,
    models::review::UpdateReviewRequest,
    state::AppState,
    utils::middleware::{AuthUser, OptionalAuth},
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id", get(get_review))
        .route("/:id", put(update_review))
        .route("/:id", delete(delete_review))
        .route("/:id/like", post(like_review))
        .route("/:id/like", delete(unlike_review))
}

/// 单条书评
/// GET /api/reviews/:id
pub async fn get_review(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(review_id): Path<String>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let review = app_state
        .review_service
        .get_review_with_author(&review_id, viewer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": review
    })))
}

/// 修改书评（仅限作者）
/// PUT /api/reviews/:id
pub async fn update_review(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<String>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Value>> {
    debug!("User {} updating review {}", user.id, review_id);

    let review = app_state
        .review_service
        .update_review(&review_id, &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": review
    })))
}

/// 删除书评（仅限作者）
/// DELETE /api/reviews/:id
pub async fn delete_review(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} deleting review {}", user.id, review_id);

    app_state
        .review_service
        .delete_review(&review_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Review deleted"
    })))
}

/// 点赞书评
/// POST /api/reviews/:id/like
pub async fn like_review(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<String>,
) -> Result<Json<Value>> {
    let review = app_state
        .review_service
        .like_review(&review_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": review
    })))
}

/// 取消点赞
/// DELETE /api/reviews/:id/like
pub async fn unlike_review(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<String>,
) -> Result<Json<Value>> {
    let review = app_state
        .review_service
        .unlike_review(&review_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": review
    })))
}
