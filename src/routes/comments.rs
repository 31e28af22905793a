use crate::{
    error::Result,
    models::comment::{CreateCommentRequest, CreateInnerCommentRequest, UpdateCommentRequest},
    state::AppState,
    utils::middleware::{AuthUser, OptionalAuth},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_comment))
        .route("/post/:post_id", get(list_comments_for_post))
        .route("/:id", get(get_comment))
        .route("/:id", put(update_comment))
        .route("/:id", delete(delete_comment))
        .route("/:id/like", post(like_comment))
        .route("/:id/like", delete(unlike_comment))
        .route("/:id/replies", post(create_reply))
        .route("/:id/replies", get(list_replies))
        .route("/replies/:id", get(get_reply))
        .route("/replies/:id", put(update_reply))
        .route("/replies/:id", delete(delete_reply))
        .route("/replies/:id/like", post(like_reply))
        .route("/replies/:id/like", delete(unlike_reply))
}

/// 发表评论，post_id 在请求体里
/// POST /api/comments
pub async fn create_comment(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    debug!("User {} creating comment", user.id);

    let comment = app_state
        .comment_service
        .create_comment(&user.id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": comment
        })),
    ))
}

/// 某条动态下的评论
/// GET /api/comments/post/:post_id
pub async fn list_comments_for_post(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let comments = app_state
        .comment_service
        .list_comments_for_post(&post_id, viewer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comments
    })))
}

/// 单条评论
/// GET /api/comments/:id
pub async fn get_comment(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(comment_id): Path<String>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let comment = app_state
        .comment_service
        .get_comment_with_author(&comment_id, viewer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comment
    })))
}

/// 修改评论（仅限作者）
/// PUT /api/comments/:id
pub async fn update_comment(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
    Json(request): Json<UpdateCommentRequest>,
) -> Result<Json<Value>> {
    let comment = app_state
        .comment_service
        .update_comment(&comment_id, &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comment
    })))
}

/// 删除评论（仅限作者）
/// DELETE /api/comments/:id
pub async fn delete_comment(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
) -> Result<Json<Value>> {
    app_state
        .comment_service
        .delete_comment(&comment_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Comment deleted"
    })))
}

/// 点赞评论
/// POST /api/comments/:id/like
pub async fn like_comment(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
) -> Result<Json<Value>> {
    let comment = app_state
        .comment_service
        .like_comment(&comment_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comment
    })))
}

/// 取消评论点赞
/// DELETE /api/comments/:id/like
pub async fn unlike_comment(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
) -> Result<Json<Value>> {
    let comment = app_state
        .comment_service
        .unlike_comment(&comment_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comment
    })))
}

/// 回复评论
/// POST /api/comments/:id/replies
pub async fn create_reply(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
    Json(request): Json<CreateInnerCommentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    debug!("User {} replying to comment {}", user.id, comment_id);

    let reply = app_state
        .comment_service
        .create_inner_comment(&comment_id, &user.id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": reply
        })),
    ))
}

/// 某条评论下的回复
/// GET /api/comments/:id/replies
pub async fn list_replies(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(comment_id): Path<String>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let replies = app_state
        .comment_service
        .list_inner_comments(&comment_id, viewer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": replies
    })))
}

/// 单条回复
/// GET /api/comments/replies/:id
pub async fn get_reply(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(reply_id): Path<String>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let reply = app_state
        .comment_service
        .get_inner_comment_with_author(&reply_id, viewer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": reply
    })))
}

/// 修改回复（仅限作者）
/// PUT /api/comments/replies/:id
pub async fn update_reply(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(reply_id): Path<String>,
    Json(request): Json<UpdateCommentRequest>,
) -> Result<Json<Value>> {
    let reply = app_state
        .comment_service
        .update_inner_comment(&reply_id, &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": reply
    })))
}

/// 删除回复（仅限作者）
/// DELETE /api/comments/replies/:id
pub async fn delete_reply(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(reply_id): Path<String>,
) -> Result<Json<Value>> {
    app_state
        .comment_service
        .delete_inner_comment(&reply_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Reply deleted"
    })))
}

/// 点赞回复
/// POST /api/comments/replies/:id/like
pub async fn like_reply(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(reply_id): Path<String>,
) -> Result<Json<Value>> {
    let reply = app_state
        .comment_service
        .like_inner_comment(&reply_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": reply
    })))
}

/// 取消回复点赞
/// DELETE /api/comments/replies/:id/like
pub async fn unlike_reply(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(reply_id): Path<String>,
) -> Result<Json<Value>> {
    let reply = app_state
        .comment_service
        .unlike_inner_comment(&reply_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": reply
    })))
}
