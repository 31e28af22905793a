use crate::{error::AppError, models::user::UserProfile, state::AppState};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type KeyedRateLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;
static RATE_LIMITER: OnceCell<KeyedRateLimiter> = OnceCell::const_new();

/// 认证中间件
///
/// 令牌可以放在 Authorization 头（裸令牌或 Bearer 前缀）或登录时种下的
/// jwt cookie 中。验证失败不会中断请求，后续提取器负责决定是否必须认证。
pub async fn auth_middleware(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    if let Some(token) = extract_token(&headers) {
        match app_state.auth_service.authenticate(&token).await {
            Ok(profile) => {
                debug!("Authenticated user: {} ({})", profile.id, profile.email);
                request.extensions_mut().insert(profile);
            }
            Err(e) => {
                debug!("Token rejected: {}", e);
                // 继续按匿名请求处理
            }
        }
    }

    Ok(next.run(request).await)
}

/// 从请求头中取出令牌，Authorization 优先于 cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get("cookie") {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for pair in cookie_str.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                if parts.next() == Some("jwt") {
                    if let Some(value) = parts.next() {
                        if !value.is_empty() {
                            return Some(value.to_string());
                        }
                    }
                }
            }
        }
    }

    None
}

/// 速率限制中间件
pub async fn rate_limit_middleware(
    State(app_state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    let rate_limiter = RATE_LIMITER
        .get_or_init(|| async {
            // 窗口内允许 rate_limit_requests 次请求
            let requests = app_state.config.rate_limit_requests.max(1);
            let window = app_state.config.rate_limit_window.max(1);
            let replenish = Duration::from_secs(window) / requests;
            let quota = Quota::with_period(replenish)
                .unwrap()
                .allow_burst(NonZeroU32::new(requests).unwrap());
            RateLimiter::dashmap(quota)
        })
        .await;

    let client_ip = get_client_ip(&request);

    match rate_limiter.check_key(&client_ip) {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            warn!("Rate limit exceeded for IP: {}", client_ip);
            Err(AppError::RateLimitExceeded)
        }
    }
}

/// 清理速率限制器中长时间没有请求的客户端条目
pub fn cleanup_rate_limiter() {
    if let Some(limiter) = RATE_LIMITER.get() {
        limiter.retain_recent();
        debug!("Rate limiter state pruned");
    }
}

/// 请求日志中间件
pub async fn request_logging_middleware(request: Request<Body>, next: Next<Body>) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = get_client_ip(&request);
    let started = std::time::Instant::now();

    debug!("Incoming request: {} {} from {}", method, uri, client_ip);

    let response = next.run(request).await;
    let status = response.status();

    info!(
        "Request completed: {} {} {} - {}ms",
        method,
        uri,
        status.as_u16(),
        started.elapsed().as_millis()
    );

    response
}

/// 获取客户端 IP 地址，优先读取代理头
fn get_client_ip(request: &Request<Body>) -> String {
    let headers = request.headers();

    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(ip_str) = forwarded_for.to_str() {
            if let Some(ip) = ip_str.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return ip_str.to_string();
        }
    }

    request
        .extensions()
        .get::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 必须认证的提取器，未认证时返回 401
pub struct AuthUser(pub UserProfile);

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<UserProfile>()
            .cloned()
            .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))?;
        Ok(AuthUser(user))
    }
}

/// 可选认证提取器
pub struct OptionalAuth(pub Option<UserProfile>);

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<UserProfile>().cloned();
        Ok(OptionalAuth(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_bearer_header() {
        let headers = headers_with("authorization", "Bearer abc.def.ghi");
        assert_eq!(extract_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_raw_header() {
        let headers = headers_with("authorization", "abc.def.ghi");
        assert_eq!(extract_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_jwt_cookie() {
        let headers = headers_with("cookie", "theme=dark; jwt=abc.def.ghi; lang=en");
        assert_eq!(extract_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_header_wins_over_cookie() {
        let mut headers = headers_with("authorization", "Bearer header-token");
        headers.insert("cookie", HeaderValue::from_static("jwt=cookie-token"));
        assert_eq!(extract_token(&headers), Some("header-token".to_string()));
    }

    #[test]
    fn test_extract_token_missing() {
        assert_eq!(extract_token(&HeaderMap::new()), None);

        let headers = headers_with("cookie", "theme=dark");
        assert_eq!(extract_token(&headers), None);
    }
}
