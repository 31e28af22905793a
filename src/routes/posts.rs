use crate::{
    error::Result,
    models::post::{CreatePostRequest, UpdatePostRequest},
    state::AppState,
    utils::middleware::{AuthUser, OptionalAuth},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_posts))
        .route("/", post(create_post))
        .route("/user/:user_id", get(list_posts_by_user))
        .route("/:id", get(get_post))
        .route("/:id", put(update_post))
        .route("/:id", delete(delete_post))
        .route("/:id/like", post(like_post))
        .route("/:id/like", delete(unlike_post))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// 动态流
/// GET /api/posts
pub async fn list_posts(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let result = app_state
        .post_service
        .list_posts(viewer_id, query.page, query.limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "posts": result.data,
            "pagination": {
                "current_page": result.page,
                "total_pages": result.total_pages,
                "total_items": result.total,
                "items_per_page": result.per_page,
                "has_next": result.page < result.total_pages,
                "has_prev": result.page > 1,
            }
        }
    })))
}

/// 发布动态
/// POST /api/posts
pub async fn create_post(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    debug!("User {} creating post", user.id);

    let created = app_state.post_service.create_post(&user.id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": created
        })),
    ))
}

/// 某用户的动态
/// GET /api/posts/user/:user_id
pub async fn list_posts_by_user(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let result = app_state
        .post_service
        .list_posts_by_user(&user_id, viewer_id, query.page, query.limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "posts": result.data,
            "pagination": {
                "current_page": result.page,
                "total_pages": result.total_pages,
                "total_items": result.total,
                "items_per_page": result.per_page,
                "has_next": result.page < result.total_pages,
                "has_prev": result.page > 1,
            }
        }
    })))
}

/// 单条动态
/// GET /api/posts/:id
pub async fn get_post(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let post = app_state
        .post_service
        .get_post_with_author(&post_id, viewer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": post
    })))
}

/// 修改动态（仅限作者）
/// PUT /api/posts/:id
pub async fn update_post(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Value>> {
    debug!("User {} updating post {}", user.id, post_id);

    let post = app_state
        .post_service
        .update_post(&post_id, &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": post
    })))
}

/// 删除动态（仅限作者）
/// DELETE /api/posts/:id
pub async fn delete_post(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} deleting post {}", user.id, post_id);

    app_state.post_service.delete_post(&post_id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Post deleted"
    })))
}

/// 点赞动态
/// POST /api/posts/:id/like
pub async fn like_post(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    let post = app_state.post_service.like_post(&post_id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": post
    })))
}

/// 取消点赞
/// DELETE /api/posts/:id/like
pub async fn unlike_post(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    let post = app_state
        .post_service
        .unlike_post(&post_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": post
    })))
}
