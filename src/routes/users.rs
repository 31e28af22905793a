use crate::{
    error::Result,
    models::user::UpdateUserRequest,
    state::AppState,
    utils::middleware::AuthUser,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user))
        .route("/:id", put(update_user))
        .route("/:id", delete(delete_user))
        .route("/:id/follow", post(follow_user))
        .route("/:id/follow", delete(unfollow_user))
        .route("/:id/followers", get(get_followers))
        .route("/:id/following", get(get_following))
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// 用户列表
/// GET /api/users
pub async fn list_users(
    State(app_state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Value>> {
    debug!("Listing users");

    let result = app_state
        .user_service
        .list_users(query.page, query.limit, query.search)
        .await?;

    let users: Vec<_> = result.data.iter().map(|u| u.to_response()).collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "users": users,
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

/// 按 ID 获取用户
/// GET /api/users/:id
pub async fn get_user(
    State(app_state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("Fetching user: {}", user_id);

    let profile = app_state.user_service.get_user(&user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": profile.to_response()
    })))
}

/// 更新用户资料（仅限本人）
/// PUT /api/users/:id
pub async fn update_user(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>> {
    debug!("User {} updating profile {}", user.id, user_id);

    let profile = app_state
        .user_service
        .update_user(&user.id, &user_id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": profile.to_response()
    })))
}

/// 删除用户（仅限本人）
/// DELETE /api/users/:id
pub async fn delete_user(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} deleting account {}", user.id, user_id);

    app_state.user_service.delete_user(&user.id, &user_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User deleted"
    })))
}

/// 关注用户，关注方取自登录态
/// POST /api/users/:id/follow
pub async fn follow_user(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    app_state.follow_service.follow_user(&user.id, &user_id).await?;

    info!("User {} followed {}", user.id, user_id);

    Ok(Json(json!({
        "success": true,
        "message": "success"
    })))
}

/// 取消关注
/// DELETE /api/users/:id/follow
pub async fn unfollow_user(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Value>> {
    app_state
        .follow_service
        .unfollow_user(&user.id, &user_id)
        .await?;

    info!("User {} unfollowed {}", user.id, user_id);

    Ok(Json(json!({
        "success": true,
        "message": "success"
    })))
}

/// 关注者列表
/// GET /api/users/:id/followers
pub async fn get_followers(
    State(app_state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    debug!("Fetching followers of user: {}", user_id);

    let result = app_state
        .follow_service
        .get_followers(&user_id, query.page, query.limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "users": result.data,
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

/// 关注列表
/// GET /api/users/:id/following
pub async fn get_following(
    State(app_state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    debug!("Fetching following of user: {}", user_id);

    let result = app_state
        .follow_service
        .get_following(&user_id, query.page, query.limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "users": result.data,
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
