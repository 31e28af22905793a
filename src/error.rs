use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error};

pub type Result<T> = std::result::Result<T, AppError>;

/// 统一错误类型：服务层返回 AppError，出口处映射为
/// `{"error": {"code", "message"}}` 形式的 JSON 响应
#[derive(Error, Debug)]
pub enum AppError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("permission denied: {0}")]
    Authorization(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("file upload rejected: {0}")]
    FileUpload(String),

    #[error("upstream service error: {0}")]
    ExternalService(String),

    #[error("upstream service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database failure: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("outbound request failure: {0}")]
    Request(#[from] reqwest::Error),

    #[error("filesystem failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("request validation failed")]
    ValidatorError(#[from] validator::ValidationErrors),
}

impl AppError {
    /// HTTP 状态码与机器可读错误码的固定映射
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR"),
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "JWT_ERROR"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "AUTHORIZATION_ERROR"),
            AppError::Validation(_) | AppError::ValidatorError(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::FileUpload(_) => (StatusCode::BAD_REQUEST, "FILE_UPLOAD_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            AppError::ExternalService(_) | AppError::Request(_) => {
                (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR")
            }
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR")
            }
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// 返回给客户端的文案；5xx 与上游故障一律用笼统措辞，细节只进日志
    fn client_message(&self) -> String {
        match self {
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::FileUpload(msg)
            | AppError::ServiceUnavailable(msg) => msg.clone(),
            AppError::RateLimitExceeded => "Rate limit exceeded".to_string(),
            AppError::Jwt(_) => "Invalid token".to_string(),
            AppError::ExternalService(_) | AppError::Request(_) => {
                "External service error".to_string()
            }
            AppError::Database(_) => "Database error".to_string(),
            AppError::Serialization(_) => "Serialization error".to_string(),
            AppError::Io(_) => "IO error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::ValidatorError(_) => "Validation failed".to_string(),
        }
    }

    fn log_server_detail(&self) {
        match self {
            AppError::Database(e) => error!("Database error: {}", e),
            AppError::Serialization(e) => error!("Serialization error: {}", e),
            AppError::Request(e) => error!("Outbound request error: {}", e),
            AppError::Io(e) => error!("IO error: {}", e),
            AppError::Internal(msg) => error!("Internal error: {}", msg),
            AppError::ExternalService(msg) => error!("External service error: {}", msg),
            AppError::Jwt(e) => debug!("Rejected token: {}", e),
            _ => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log_server_detail();

        // 字段级校验错误把逐字段信息放进 details
        if let AppError::ValidatorError(ref errors) = self {
            let details: HashMap<String, Vec<String>> = errors
                .field_errors()
                .iter()
                .map(|(field, errs)| {
                    let messages = errs
                        .iter()
                        .map(|err| {
                            err.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| "Invalid value".to_string())
                        })
                        .collect();
                    (field.to_string(), messages)
                })
                .collect();

            let body = json!({
                "error": {
                    "code": "VALIDATION_ERROR",
                    "message": "Validation failed",
                    "details": details
                }
            });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }

        let (status, code) = self.status_and_code();
        let body = json!({
            "error": {
                "code": code,
                "message": self.client_message()
            }
        });
        (status, Json(body)).into_response()
    }
}

/// 服务层常用的简写构造
impl AppError {
    pub fn not_found(msg: &str) -> Self {
        Self::NotFound(msg.to_string())
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::Authorization(msg.to_string())
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::BadRequest(msg.to_string())
    }

    pub fn conflict(msg: &str) -> Self {
        Self::Conflict(msg.to_string())
    }

    pub fn internal(msg: &str) -> Self {
        Self::Internal(msg.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::not_found("Book not found").status_and_code(),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
        assert_eq!(
            AppError::forbidden("nope").status_and_code().0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::conflict("dup").status_and_code().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::RateLimitExceeded.status_and_code().0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::ServiceUnavailable("down".to_string())
                .status_and_code()
                .0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_server_errors_hide_details_from_clients() {
        let err = AppError::internal("connection string with password");
        assert_eq!(err.client_message(), "Internal server error");

        let err = AppError::ExternalService("ocr returned 500".to_string());
        assert_eq!(err.client_message(), "External service error");

        // 客户端可见的错误原样透传
        let err = AppError::bad_request("You have already rated this book");
        assert_eq!(err.client_message(), "You have already rated this book");
    }
}
