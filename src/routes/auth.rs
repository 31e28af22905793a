use crate::{
    error::{AppError, Result},
    models::user::{LoginRequest, RegisterRequest},
    state::AppState,
    utils::middleware::AuthUser,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// 注册新用户
/// POST /api/auth/register
pub async fn register(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    debug!("Registering new user: {}", request.email);

    let profile = app_state.auth_service.register(request).await?;

    info!("Registered user: {}", profile.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": profile.to_response()
        })),
    ))
}

/// 用户登录，签发 JWT 并写入 HttpOnly cookie
/// POST /api/auth/login
pub async fn login(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<Value>)> {
    debug!("Login attempt for: {}", request.email);

    let (profile, token) = app_state.auth_service.login(request).await?;

    let mut cookie = format!(
        "jwt={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        token,
        app_state.auth_service.cookie_max_age_seconds()
    );
    // 生产环境下 cookie 只走 HTTPS
    if app_state.is_production() {
        cookie.push_str("; Secure");
    }
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Internal(format!("Failed to build cookie: {}", e)))?,
    );

    info!("User logged in: {}", profile.id);

    Ok((
        headers,
        Json(json!({
            "success": true,
            "data": {
                "jwt": token,
                "user": profile.to_response()
            }
        })),
    ))
}

/// 退出登录，清除 cookie
/// POST /api/auth/logout
pub async fn logout() -> Result<(HeaderMap, Json<Value>)> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("jwt=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax"),
    );

    Ok((
        headers,
        Json(json!({
            "success": true,
            "message": "success"
        })),
    ))
}

/// 当前登录用户的资料
/// GET /api/auth/me
pub async fn get_current_user(AuthUser(user): AuthUser) -> Result<Json<Value>> {
    debug!("Getting current user info for user: {}", user.id);

    Ok(Json(json!({
        "success": true,
        "data": user.to_response()
    })))
}
