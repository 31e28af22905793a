use crate::{
    error::{AppError, Result},
    models::{
        book::{CreateBookRequest, UpdateBookRequest},
        review::CreateReviewRequest,
        shelf::ReadingState,
    },
    services::book::PriceOrder,
    services::storage,
    state::AppState,
    utils::middleware::{AuthUser, OptionalAuth},
};
use axum::{
    body::StreamBody,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_books))
        .route("/", post(create_book))
        .route("/free", get(list_free_books))
        .route("/top-rated", get(list_top_rated))
        .route("/popular", get(list_popular))
        .route("/search", get(search_books))
        .route("/genre/:genre", get(list_books_by_genre))
        .route("/genre/:genre/priced", get(list_books_by_genre_priced))
        .route("/user/:user_id", get(list_books_by_user))
        .route("/shelf/:state", get(list_shelf))
        .route("/:id", get(get_book))
        .route("/:id", put(update_book))
        .route("/:id", delete(delete_book))
        .route("/:id/rate/:rating", post(rate_book))
        .route("/:id/shelf/:state", post(add_to_shelf))
        .route("/:id/shelf/:state", delete(remove_from_shelf))
        .route("/:id/cover", post(upload_cover))
        .route("/:id/cover", get(download_cover))
        .route("/:id/pdf", post(upload_pdf))
        .route("/:id/pdf", get(download_pdf))
        .route("/:id/summaries", post(upload_summary))
        .route("/:id/summaries", get(list_summaries))
        .route("/:id/reviews", post(create_review))
        .route("/:id/reviews", get(list_reviews))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PricedQuery {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// 统一的分页书目响应
fn paginated_books(
    result: &crate::services::database::PaginatedResult<crate::models::book::Book>,
) -> Json<Value> {
    let books: Vec<_> = result.data.iter().map(|b| b.to_response()).collect();
    Json(json!({
        "success": true,
        "data": {
            "books": books,
            "pagination": {
                "current_page": result.page,
                "total_pages": result.total_pages,
                "total_items": result.total,
                "items_per_page": result.per_page,
                "has_next": result.page < result.total_pages,
                "has_prev": result.page > 1,
            }
        }
    }))
}

/// 书目列表
/// GET /api/books
pub async fn list_books(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    debug!("Listing books");

    let result = app_state
        .book_service
        .list_books(query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

/// 创建书目
/// POST /api/books
pub async fn create_book(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    debug!("User {} creating book", user.id);

    let book = app_state.book_service.create_book(&user.id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": book.to_response()
        })),
    ))
}

/// 单本书目
/// GET /api/books/:id
pub async fn get_book(
    State(app_state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<Value>> {
    let book = app_state.book_service.get_book(&book_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": book.to_response()
    })))
}

/// 更新书目（仅限创建者）
/// PUT /api/books/:id
pub async fn update_book(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(book_id): Path<String>,
    Json(request): Json<UpdateBookRequest>,
) -> Result<Json<Value>> {
    let book = app_state
        .book_service
        .update_book(&book_id, &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": book.to_response()
    })))
}

/// 删除书目（仅限创建者）
/// DELETE /api/books/:id
pub async fn delete_book(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(book_id): Path<String>,
) -> Result<Json<Value>> {
    app_state.book_service.delete_book(&book_id, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Book deleted"
    })))
}

/// 给书目评分
/// POST /api/books/:id/rate/:rating
pub async fn rate_book(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((book_id, rating)): Path<(String, f64)>,
) -> Result<Json<Value>> {
    let book = app_state
        .book_service
        .rate_book(&book_id, &user.id, rating)
        .await?;

    info!("User {} rated book {}", user.id, book_id);

    Ok(Json(json!({
        "success": true,
        "data": book.to_response()
    })))
}

/// 某用户创建的书目
/// GET /api/books/user/:user_id
pub async fn list_books_by_user(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let result = app_state
        .book_service
        .list_books_by_user(&user_id, query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

/// 按类型筛选
/// GET /api/books/genre/:genre
pub async fn list_books_by_genre(
    State(app_state): State<Arc<AppState>>,
    Path(genre): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let result = app_state
        .book_service
        .list_books_by_genre(&genre, query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

/// 按类型加价格区间筛选
/// GET /api/books/genre/:genre/priced?min=&max=&order=
pub async fn list_books_by_genre_priced(
    State(app_state): State<Arc<AppState>>,
    Path(genre): Path<String>,
    Query(query): Query<PricedQuery>,
) -> Result<Json<Value>> {
    let min = query
        .min
        .ok_or_else(|| AppError::bad_request("min query parameter is required"))?;
    let max = query
        .max
        .ok_or_else(|| AppError::bad_request("max query parameter is required"))?;
    let order = PriceOrder::from_param(query.order.as_deref());

    let result = app_state
        .book_service
        .list_books_by_genre_priced(&genre, min, max, order, query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

/// 免费书目
/// GET /api/books/free
pub async fn list_free_books(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let result = app_state
        .book_service
        .list_free_books(query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

/// 评分最高
/// GET /api/books/top-rated
pub async fn list_top_rated(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let result = app_state
        .book_service
        .list_top_rated(query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

/// 热门书目
/// GET /api/books/popular
pub async fn list_popular(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let result = app_state
        .book_service
        .list_popular(query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

/// 搜索书目
/// GET /api/books/search?q=
pub async fn search_books(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>> {
    let q = query
        .q
        .ok_or_else(|| AppError::bad_request("q query parameter is required"))?;

    debug!("Searching books for: {}", q);

    let result = app_state
        .book_service
        .search_books(&q, query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

/// 加入书架
/// POST /api/books/:id/shelf/:state
pub async fn add_to_shelf(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((book_id, state)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let state = ReadingState::from_param(&state)
        .ok_or_else(|| AppError::bad_request("Invalid reading state"))?;

    app_state
        .shelf_service
        .add_to_shelf(&user.id, &book_id, state)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "success"
    })))
}

/// 移出书架
/// DELETE /api/books/:id/shelf/:state
pub async fn remove_from_shelf(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((book_id, state)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let state = ReadingState::from_param(&state)
        .ok_or_else(|| AppError::bad_request("Invalid reading state"))?;

    app_state
        .shelf_service
        .remove_from_shelf(&user.id, &book_id, state)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "success"
    })))
}

/// 当前用户某个状态的书架
/// GET /api/books/shelf/:state
pub async fn list_shelf(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(state): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let state = ReadingState::from_param(&state)
        .ok_or_else(|| AppError::bad_request("Invalid reading state"))?;

    let result = app_state
        .shelf_service
        .list_shelf(&user.id, state, query.page, query.limit)
        .await?;
    Ok(paginated_books(&result))
}

// 从 multipart 表单取出上传文件与可选的 title 字段
async fn read_upload(mut multipart: Multipart) -> Result<(Option<String>, String, Vec<u8>)> {
    let mut title: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart request: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            "title" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read title field: {}", e)))?;
                title = Some(value);
            }
            _ => {}
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::bad_request("No file found in the request"))?;
    Ok((title, filename, data))
}

/// 上传封面（仅限创建者）
/// POST /api/books/:id/cover
pub async fn upload_cover(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(book_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let (_, filename, data) = read_upload(multipart).await?;

    debug!(
        "User {} uploading cover for book {} ({} bytes)",
        user.id,
        book_id,
        data.len()
    );

    let book = app_state
        .book_service
        .attach_cover(&book_id, &user.id, &filename, &data)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": book.to_response()
    })))
}

/// 下载封面
/// GET /api/books/:id/cover
pub async fn download_cover(
    State(app_state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<impl IntoResponse> {
    let (file, size, path) = app_state.book_service.open_cover(&book_id).await?;

    let stream = ReaderStream::new(file);
    let body = StreamBody::new(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        storage::content_type_for(&path)
            .parse()
            .map_err(|_| AppError::internal("Failed to build response headers"))?,
    );
    headers.insert(
        header::CONTENT_LENGTH,
        size.to_string()
            .parse()
            .map_err(|_| AppError::internal("Failed to build response headers"))?,
    );

    Ok((headers, body))
}

/// 上传 PDF（仅限创建者）
/// POST /api/books/:id/pdf
pub async fn upload_pdf(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(book_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let (_, filename, data) = read_upload(multipart).await?;

    debug!(
        "User {} uploading PDF for book {} ({} bytes)",
        user.id,
        book_id,
        data.len()
    );

    let book = app_state
        .book_service
        .attach_pdf(&book_id, &user.id, &filename, &data)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": book.to_response()
    })))
}

/// 下载 PDF（附件形式）
/// GET /api/books/:id/pdf
pub async fn download_pdf(
    State(app_state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<impl IntoResponse> {
    let (file, size, book) = app_state.book_service.open_pdf(&book_id).await?;

    let stream = ReaderStream::new(file);
    let body = StreamBody::new(stream);

    let filename = format!("{}.pdf", sanitize_filename(&book.title));
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        "application/pdf"
            .parse()
            .map_err(|_| AppError::internal("Failed to build response headers"))?,
    );
    headers.insert(
        header::CONTENT_LENGTH,
        size.to_string()
            .parse()
            .map_err(|_| AppError::internal("Failed to build response headers"))?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", filename)
            .parse()
            .map_err(|_| AppError::internal("Failed to build response headers"))?,
    );

    Ok((headers, body))
}

// 文件名里只保留 header 安全的字符
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else if c == ' ' {
                '_'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect();
    if cleaned.is_empty() {
        "book".to_string()
    } else {
        cleaned
    }
}

/// 上传摘要文件
/// POST /api/books/:id/summaries
pub async fn upload_summary(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(book_id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    let (title, filename, data) = read_upload(multipart).await?;

    debug!(
        "User {} uploading summary for book {} ({} bytes)",
        user.id,
        book_id,
        data.len()
    );

    let summary = app_state
        .summary_service
        .upload_summary(&book_id, title, &filename, &data)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": summary.to_response()
        })),
    ))
}

/// 某本书的摘要列表
/// GET /api/books/:id/summaries
pub async fn list_summaries(
    State(app_state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<Value>> {
    let summaries = app_state
        .summary_service
        .list_summaries_for_book(&book_id)
        .await?;
    let summaries: Vec<_> = summaries.iter().map(|s| s.to_response()).collect();

    Ok(Json(json!({
        "success": true,
        "data": summaries
    })))
}

/// 发表书评
/// POST /api/books/:id/reviews
pub async fn create_review(
    State(app_state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(book_id): Path<String>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let review = app_state
        .review_service
        .create_review(&book_id, &user.id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": review
        })),
    ))
}

/// 某本书的书评，按点赞数排序
/// GET /api/books/:id/reviews
pub async fn list_reviews(
    State(app_state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(book_id): Path<String>,
) -> Result<Json<Value>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let reviews = app_state
        .review_service
        .list_reviews_for_book(&book_id, viewer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": reviews
    })))
}
