use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,

    // Database configuration
    pub database_url: String,
    pub database_namespace: String,
    pub database_name: String,
    pub database_username: String,
    pub database_password: String,

    // Authentication configuration
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,

    // Storage configuration
    pub media_root: String,
    pub max_upload_size: u64,

    // External AI services
    pub translate_service_url: String,
    pub ocr_service_url: String,

    // Content settings
    pub default_books_per_page: usize,
    pub default_feed_per_page: usize,
    pub max_page_size: usize,

    // Rate limiting
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,

    // Search configuration
    pub search_min_length: usize,
    pub search_max_results: usize,

    // CORS configuration
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            database_namespace: env::var("DATABASE_NAMESPACE")
                .unwrap_or_else(|_| "bookhive".to_string()),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "platform".to_string()),
            database_username: env::var("DATABASE_USERNAME")
                .unwrap_or_else(|_| "root".to_string()),
            database_password: env::var("DATABASE_PASSWORD")
                .unwrap_or_else(|_| "root".to_string()),

            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiry_minutes: env::var("JWT_EXPIRY_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,

            media_root: env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| "./media".to_string()),
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .unwrap_or_else(|_| "52428800".to_string())
                .parse()?,

            translate_service_url: env::var("TRANSLATE_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            ocr_service_url: env::var("OCR_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:5001".to_string()),

            default_books_per_page: env::var("DEFAULT_BOOKS_PER_PAGE")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
            default_feed_per_page: env::var("DEFAULT_FEED_PER_PAGE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            max_page_size: env::var("MAX_PAGE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            rate_limit_window: env::var("RATE_LIMIT_WINDOW")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,

            search_min_length: env::var("SEARCH_MIN_LENGTH")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,
            search_max_results: env::var("SEARCH_MAX_RESULTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
impl Config {
    /// 测试用配置，不读取环境变量
    pub fn default_for_tests() -> Self {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "test".to_string(),
            database_url: "http://localhost:8000".to_string(),
            database_namespace: "bookhive_test".to_string(),
            database_name: "platform_test".to_string(),
            database_username: "root".to_string(),
            database_password: "root".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_minutes: 60,
            media_root: "./media".to_string(),
            max_upload_size: 52428800,
            translate_service_url: "http://localhost:5000".to_string(),
            ocr_service_url: "http://localhost:5001".to_string(),
            default_books_per_page: 4,
            default_feed_per_page: 5,
            max_page_size: 100,
            rate_limit_requests: 100,
            rate_limit_window: 60,
            search_min_length: 2,
            search_max_results: 100,
            cors_allowed_origins: "http://localhost:3001".to_string(),
        }
    }
}
