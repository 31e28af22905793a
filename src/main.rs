use std::sync::Arc;
use axum::{
    routing::{Router, get},
    extract::DefaultBodyLimit,
    http::{Method, HeaderValue},
    middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    compression::CompressionLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing::{info, warn, error};
use tokio::time::{interval, Duration};

mod routes;
mod models;
mod services;
mod config;
mod error;
mod utils;
mod state;

use crate::{
    config::Config,
    state::AppState,
    services::{
        Database,
        AuthService,
        UserService,
        FollowService,
        BookService,
        ShelfService,
        ReviewService,
        SummaryService,
        PostService,
        CommentService,
        MessageService,
        StorageService,
        AiService,
    },
    utils::middleware::{auth_middleware, rate_limit_middleware, request_logging_middleware},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "bookhive=debug,tower_http=debug".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BookHive service...");

    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;
    let shared_config = Arc::new(config.clone());

    // 初始化数据库连接
    let db = Arc::new(match Database::new(&config).await {
        Ok(db) => {
            match db.verify_connection().await {
                Ok(_) => {
                    info!("Database connection established successfully");
                    db
                }
                Err(e) => {
                    // 只在开发环境尝试自动拉起本地数据库
                    if !config.is_development() {
                        error!("Database connection failed: {}", e);
                        return Err(anyhow::anyhow!("Database connection failed"));
                    }
                    warn!("Database connection failed: {}", e);
                    info!("Attempting to auto-start database...");

                    if let Err(start_err) = auto_start_database(&config).await {
                        error!("Failed to auto-start database: {}. Original error: {}", start_err, e);
                        return Err(anyhow::anyhow!("Database connection failed"));
                    }

                    // 重新尝试连接
                    let db = Database::new(&config).await?;
                    db.verify_connection().await?;
                    info!("Database auto-started and connected successfully");
                    db
                }
            }
        }
        Err(e) => {
            error!("Failed to create database connection: {}", e);
            return Err(anyhow::anyhow!("Database initialization failed"));
        }
    });

    // 初始化所有服务
    let storage = Arc::new(StorageService::new(&config).await?);
    let auth_service = AuthService::new(&config, db.clone()).await?;
    let user_service = UserService::new(db.clone()).await?;
    let follow_service = FollowService::new(db.clone()).await?;
    let book_service = BookService::new(db.clone(), storage.clone(), shared_config.clone()).await?;
    let shelf_service = ShelfService::new(db.clone()).await?;
    let review_service = ReviewService::new(db.clone()).await?;
    let summary_service = SummaryService::new(db.clone(), storage.clone()).await?;
    let post_service = PostService::new(db.clone(), shared_config.clone()).await?;
    let comment_service = CommentService::new(db.clone()).await?;
    let message_service = MessageService::new(db.clone()).await?;
    let ai_service = AiService::new(shared_config.clone()).await?;

    // 创建应用状态
    let app_state = Arc::new(AppState {
        config: config.clone(),
        auth_service,
        user_service,
        follow_service,
        book_service,
        shelf_service,
        review_service,
        summary_service,
        post_service,
        comment_service,
        message_service,
        ai_service,
    });

    // 启动后台任务
    start_background_tasks().await;

    // 配置 CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(
            config.cors_allowed_origins
                .split(',')
                .map(|origin| origin.parse::<HeaderValue>().unwrap())
                .collect::<Vec<_>>(),
        );

    // 构建应用路由
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/auth", routes::auth::router())
        .nest("/api/users", routes::users::router())
        .nest("/api/books", routes::books::router())
        .nest("/api/summaries", routes::summaries::router())
        .nest("/api/reviews", routes::reviews::router())
        .nest("/api/posts", routes::posts::router())
        .nest("/api/comments", routes::comments::router())
        .nest("/api/messages", routes::messages::router())
        .nest("/api/ai", routes::ai::router())
        .layer(middleware::from_fn_with_state(app_state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(app_state.clone(), rate_limit_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(DefaultBodyLimit::max(config.max_upload_size as usize))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "BookHive is running!"
}

async fn auto_start_database(config: &Config) -> anyhow::Result<()> {
    info!("Attempting to start SurrealDB...");

    // 以内存模式拉起本地 SurrealDB 进程
    let spawned = tokio::process::Command::new("surreal")
        .arg("start")
        .args(["--user", &config.database_username])
        .args(["--pass", &config.database_password])
        .arg("memory")
        .spawn();

    match spawned {
        Ok(_) => {
            // 留出时间让数据库完成监听
            tokio::time::sleep(Duration::from_secs(3)).await;
            info!("SurrealDB started successfully");
            Ok(())
        }
        Err(e) => {
            error!("Failed to start SurrealDB: {}", e);
            Err(anyhow::anyhow!("Failed to start database"))
        }
    }
}

async fn start_background_tasks() {
    info!("Starting background tasks...");

    // 定期清理速率限制器中不再活跃的客户端
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(3600)); // 每小时执行一次

        loop {
            interval.tick().await;
            utils::middleware::cleanup_rate_limiter();
        }
    });

    info!("Background tasks started successfully");
}
