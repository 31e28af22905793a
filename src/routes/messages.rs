use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{
    error::Result,
    models::{
        message::{CreateMessageRequest, Message, MessageListResponse, MessageQuery, UpdateMessageRequest},
        response::ApiResponse,
    },
    state::AppState,
    utils::middleware::AuthUser,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(send_message))
        .route("/", get(list_messages))
        .route("/:message_id", get(get_message))
        .route("/:message_id", put(update_message))
        .route("/:message_id", delete(delete_message))
}

/// 发送私信
async fn send_message(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>)> {
    let message = app_state
        .message_service
        .send_message(&user.id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(message))))
}

/// 当前用户的私信，?with=user_id 限定会话对端
async fn list_messages(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<MessageQuery>,
) -> Result<Json<ApiResponse<MessageListResponse>>> {
    let result = app_state
        .message_service
        .list_messages(&user.id, query.with.as_deref(), query.page, query.limit)
        .await?;

    let response = MessageListResponse {
        messages: result.data,
        total: result.total,
        page: result.page,
        limit: result.per_page,
        total_pages: result.total_pages,
    };

    Ok(Json(ApiResponse::success(response)))
}

/// 获取单条私信，仅限收发双方
async fn get_message(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<String>,
) -> Result<Json<ApiResponse<Message>>> {
    let message = app_state
        .message_service
        .get_message(&message_id, &user.id)
        .await?;

    Ok(Json(ApiResponse::success(message)))
}

/// 修改私信内容，仅限发送者
async fn update_message(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<String>,
    Json(request): Json<UpdateMessageRequest>,
) -> Result<Json<ApiResponse<Message>>> {
    let message = app_state
        .message_service
        .update_message(&message_id, &user.id, request)
        .await?;

    Ok(Json(ApiResponse::success(message)))
}

/// 删除私信，仅限发送者
async fn delete_message(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(message_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    app_state
        .message_service
        .delete_message(&message_id, &user.id)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        (),
        "Message deleted".to_string(),
    )))
}
