use crate::{
    config::Config,
    error::{AppError, Result},
    models::book::{Book, BookRating, CreateBookRequest, UpdateBookRequest},
    models::summary::BookSummary,
    services::database::{Database, PaginatedResult},
    services::storage::{StorageService, COVER_EXTENSIONS, PDF_EXTENSIONS},
    utils::validation,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// 图书目录服务
#[derive(Clone)]
pub struct BookService {
    db: Arc<Database>,
    storage: Arc<StorageService>,
    config: Arc<Config>,
}

/// 价格筛选的排序方向，desc 之外一律按升序处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrder {
    Asc,
    Desc,
}

impl PriceOrder {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("desc") => PriceOrder::Desc,
            _ => PriceOrder::Asc,
        }
    }
}

/// 标题 / 作者 / 类别上的子串匹配与 ~ 模糊匹配并集，查询词在绑定前已转小写
const SEARCH_CONDITION: &str = "(string::lowercase(title) CONTAINS $q \
     OR string::lowercase(author) CONTAINS $q \
     OR string::lowercase(genre) CONTAINS $q \
     OR title ~ $q OR author ~ $q OR genre ~ $q)";

impl BookService {
    pub async fn new(
        db: Arc<Database>,
        storage: Arc<StorageService>,
        config: Arc<Config>,
    ) -> Result<Self> {
        Ok(Self {
            db,
            storage,
            config,
        })
    }

    /// 创建新书目
    pub async fn create_book(&self, creator_id: &str, request: CreateBookRequest) -> Result<Book> {
        debug!("Creating book for user: {}", creator_id);

        request.validate().map_err(AppError::ValidatorError)?;

        let book = Book::new(creator_id, request);
        let created = self.db.create("book", &book).await?;
        info!("Created book: {} ({})", created.title, created.id);
        Ok(created)
    }

    pub async fn get_book(&self, book_id: &str) -> Result<Book> {
        self.db
            .get_by_id::<Book>("book", book_id)
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))
    }

    /// 更新书目，仅限创建者
    pub async fn update_book(
        &self,
        book_id: &str,
        acting_user_id: &str,
        request: UpdateBookRequest,
    ) -> Result<Book> {
        debug!("Updating book: {} by user: {}", book_id, acting_user_id);

        request.validate().map_err(AppError::ValidatorError)?;

        let book = self.get_book(book_id).await?;
        if !book.is_owned_by(acting_user_id) {
            return Err(AppError::Authorization(
                "Only the book owner can update this book".to_string(),
            ));
        }

        let mut updates = Map::new();
        if let Some(title) = request.title {
            updates.insert("title".to_string(), json!(title));
        }
        if let Some(author) = request.author {
            updates.insert("author".to_string(), json!(author));
        }
        if let Some(genre) = request.genre {
            updates.insert("genre".to_string(), json!(genre));
        }
        if let Some(publisher) = request.publisher {
            updates.insert("publisher".to_string(), json!(publisher));
        }
        if let Some(publication_date) = request.publication_date {
            updates.insert("publication_date".to_string(), json!(publication_date));
        }
        if let Some(price) = request.price {
            updates.insert("price".to_string(), json!(price));
        }
        if let Some(description) = request.description {
            updates.insert("description".to_string(), json!(description));
        }
        updates.insert("updated_at".to_string(), json!(chrono::Utc::now()));

        let updated = self
            .db
            .update_by_id_with_json::<Book>("book", book_id, Value::Object(updates))
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))?;

        info!("Updated book: {}", book_id);
        Ok(updated)
    }

    /// 删除书目及其关联数据，仅限创建者
    pub async fn delete_book(&self, book_id: &str, acting_user_id: &str) -> Result<()> {
        debug!("Deleting book: {} by user: {}", book_id, acting_user_id);

        let book = self.get_book(book_id).await?;
        if !book.is_owned_by(acting_user_id) {
            return Err(AppError::Authorization(
                "Only the book owner can delete this book".to_string(),
            ));
        }

        // 先清理落盘文件
        if let Some(ref path) = book.cover_path {
            self.storage.delete(path).await?;
        }
        if let Some(ref path) = book.pdf_path {
            self.storage.delete(path).await?;
        }
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM book_summary WHERE book_id = $book_id",
                json!({ "book_id": book_id }),
            )
            .await?;
        let summaries: Vec<BookSummary> = response.take(0)?;
        for summary in &summaries {
            self.storage.delete(&summary.file_path).await?;
        }

        // 再清理关联记录与书目本身
        self.db
            .query_with_params(
                r#"
                DELETE book_rating WHERE book_id = $book_id;
                DELETE book_shelf WHERE book_id = $book_id;
                DELETE book_summary WHERE book_id = $book_id;
                DELETE review_like WHERE review_id IN (SELECT VALUE meta::id(id) FROM book_review WHERE book_id = $book_id);
                DELETE book_review WHERE book_id = $book_id;
                "#,
                json!({ "book_id": book_id }),
            )
            .await?;
        self.db.delete_by_id("book", book_id).await?;

        info!("Deleted book: {}", book_id);
        Ok(())
    }

    /// 为书目评分；同一用户只能评一次
    pub async fn rate_book(&self, book_id: &str, user_id: &str, rating: f64) -> Result<Book> {
        debug!(
            "User {} rating book {} with {}",
            user_id, book_id, rating
        );

        validation::validate_rating(rating)?;
        self.get_book(book_id).await?;

        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM book_rating WHERE user_id = $user_id AND book_id = $book_id LIMIT 1",
                json!({
                    "user_id": user_id,
                    "book_id": book_id
                }),
            )
            .await?;
        let existing: Vec<Value> = response.take(0)?;
        if !existing.is_empty() {
            return Err(AppError::bad_request("You have already rated this book"));
        }

        let record = BookRating::new(user_id, book_id, rating);
        self.db.create("book_rating", &record).await?;

        // 累加后由存量重新推导均值，避免计数漂移
        let mut response = self
            .db
            .query_with_params(
                r#"
                UPDATE type::thing('book', $book_id) SET rating_sum += $rating, rating_count += 1, updated_at = time::now();
                UPDATE type::thing('book', $book_id) SET rate = math::round(rating_sum / rating_count * 10) / 10 RETURN AFTER;
                "#,
                json!({
                    "book_id": book_id,
                    "rating": rating
                }),
            )
            .await?;
        let updated: Vec<Book> = response.take(1)?;
        let book = updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Book not found"))?;

        info!("User {} rated book {} ({})", user_id, book_id, rating);
        Ok(book)
    }

    /// 全量书目列表，按创建时间倒序
    pub async fn list_books(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        self.run_listing(&[], Map::new(), "created_at DESC", page, per_page)
            .await
    }

    /// 某个用户创建的书目
    pub async fn list_books_by_user(
        &self,
        user_id: &str,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        let mut params = Map::new();
        params.insert("user_id".to_string(), json!(user_id));
        self.run_listing(
            &["created_by = $user_id".to_string()],
            params,
            "created_at DESC",
            page,
            per_page,
        )
        .await
    }

    /// 按类型筛选
    pub async fn list_books_by_genre(
        &self,
        genre: &str,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        let mut params = Map::new();
        params.insert("genre".to_string(), json!(genre));
        self.run_listing(
            &["genre = $genre".to_string()],
            params,
            "created_at DESC",
            page,
            per_page,
        )
        .await
    }

    /// 按类型加价格区间筛选，按价格排序
    pub async fn list_books_by_genre_priced(
        &self,
        genre: &str,
        min_price: f64,
        max_price: f64,
        order: PriceOrder,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        if min_price > max_price {
            return Err(AppError::bad_request(
                "Minimum price cannot exceed maximum price",
            ));
        }

        let mut params = Map::new();
        params.insert("genre".to_string(), json!(genre));
        params.insert("min_price".to_string(), json!(min_price));
        params.insert("max_price".to_string(), json!(max_price));

        let order_by = match order {
            PriceOrder::Asc => "price ASC",
            PriceOrder::Desc => "price DESC",
        };

        self.run_listing(
            &[
                "genre = $genre".to_string(),
                "price >= $min_price".to_string(),
                "price <= $max_price".to_string(),
            ],
            params,
            order_by,
            page,
            per_page,
        )
        .await
    }

    /// 免费书目
    pub async fn list_free_books(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        self.run_listing(
            &["price = 0".to_string()],
            Map::new(),
            "created_at DESC",
            page,
            per_page,
        )
        .await
    }

    /// 评分最高的书目
    pub async fn list_top_rated(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        self.run_listing(&[], Map::new(), "rate DESC", page, per_page)
            .await
    }

    /// 按阅读人数排序的热门书目
    pub async fn list_popular(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        self.run_listing(
            &[],
            Map::new(),
            "readers_count DESC, reading_count DESC, to_read_count DESC",
            page,
            per_page,
        )
        .await
    }

    /// 标题、作者、类型的模糊搜索
    pub async fn search_books(
        &self,
        query: &str,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        let trimmed = query.trim();
        if trimmed.len() < self.config.search_min_length {
            return Err(AppError::bad_request(&format!(
                "Search query must be at least {} characters",
                self.config.search_min_length
            )));
        }

        let mut params = Map::new();
        params.insert("q".to_string(), json!(trimmed.to_lowercase()));

        let condition = SEARCH_CONDITION.to_string();

        // 搜索结果的单页上限独立于普通列表
        let per_page = per_page
            .unwrap_or(self.config.default_books_per_page as i64)
            .clamp(1, self.config.search_max_results as i64);

        self.run_listing(&[condition], params, "created_at DESC", page, Some(per_page))
            .await
    }

    /// 上传封面，仅限创建者；旧封面文件会被替换
    pub async fn attach_cover(
        &self,
        book_id: &str,
        acting_user_id: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<Book> {
        let book = self.get_book(book_id).await?;
        if !book.is_owned_by(acting_user_id) {
            return Err(AppError::Authorization(
                "Only the book owner can upload files for this book".to_string(),
            ));
        }

        let stored = self
            .storage
            .save("covers", original_name, COVER_EXTENSIONS, data)
            .await?;
        if let Some(ref old) = book.cover_path {
            self.storage.delete(old).await?;
        }

        let updated = self
            .db
            .update_by_id_with_json::<Book>(
                "book",
                book_id,
                json!({
                    "cover_path": stored.relative_path,
                    "updated_at": chrono::Utc::now(),
                }),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))?;

        info!("Attached cover to book: {}", book_id);
        Ok(updated)
    }

    /// 上传 PDF 正文，仅限创建者
    pub async fn attach_pdf(
        &self,
        book_id: &str,
        acting_user_id: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<Book> {
        let book = self.get_book(book_id).await?;
        if !book.is_owned_by(acting_user_id) {
            return Err(AppError::Authorization(
                "Only the book owner can upload files for this book".to_string(),
            ));
        }

        let stored = self
            .storage
            .save("pdfs", original_name, PDF_EXTENSIONS, data)
            .await?;
        if let Some(ref old) = book.pdf_path {
            self.storage.delete(old).await?;
        }

        let updated = self
            .db
            .update_by_id_with_json::<Book>(
                "book",
                book_id,
                json!({
                    "pdf_path": stored.relative_path,
                    "updated_at": chrono::Utc::now(),
                }),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))?;

        info!("Attached PDF to book: {}", book_id);
        Ok(updated)
    }

    /// 打开封面文件用于下载
    pub async fn open_cover(&self, book_id: &str) -> Result<(tokio::fs::File, u64, String)> {
        let book = self.get_book(book_id).await?;
        let path = book.cover_path.ok_or_else(|| {
            AppError::not_found("The requested book does not have a cover image")
        })?;
        let (file, size) = self.storage.open(&path).await?;
        Ok((file, size, path))
    }

    /// 打开 PDF 文件用于下载
    pub async fn open_pdf(&self, book_id: &str) -> Result<(tokio::fs::File, u64, Book)> {
        let book = self.get_book(book_id).await?;
        let path = book
            .pdf_path
            .clone()
            .ok_or_else(|| AppError::not_found("The requested book does not have a PDF file"))?;
        let (file, size) = self.storage.open(&path).await?;
        Ok((file, size, book))
    }

    /// 读取 PDF 原始内容，供 OCR 使用
    pub async fn read_pdf(&self, book_id: &str) -> Result<Vec<u8>> {
        let book = self.get_book(book_id).await?;
        let path = book
            .pdf_path
            .ok_or_else(|| AppError::not_found("The requested book does not have a PDF file"))?;
        self.storage.read(&path).await
    }

    // 列表查询的公共骨架：条件拼接、总数统计、分页取数
    async fn run_listing(
        &self,
        conditions: &[String],
        mut params: Map<String, Value>,
        order_by: &str,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(self.config.default_books_per_page as i64)
            .clamp(1, self.config.max_page_size as i64);
        let offset = (page - 1) * per_page;

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!(
            "SELECT count() AS total FROM book {} GROUP ALL",
            where_clause
        );
        let mut count_response = self
            .db
            .query_with_params(&count_query, Value::Object(params.clone()))
            .await?;
        let total_row: Option<Value> = count_response.take(0)?;
        let total = total_row
            .as_ref()
            .and_then(|v| v.get("total"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        params.insert("limit".to_string(), json!(per_page));
        params.insert("offset".to_string(), json!(offset));

        let data_query = format!(
            "SELECT * FROM book {} ORDER BY {} LIMIT $limit START $offset",
            where_clause, order_by
        );
        let mut response = self
            .db
            .query_with_params(&data_query, Value::Object(params))
            .await?;
        let books: Vec<Book> = response.take(0)?;

        Ok(PaginatedResult::new(books, total, page, per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_order_from_param() {
        assert_eq!(PriceOrder::from_param(Some("desc")), PriceOrder::Desc);
        assert_eq!(PriceOrder::from_param(Some("asc")), PriceOrder::Asc);
        assert_eq!(PriceOrder::from_param(Some("anything")), PriceOrder::Asc);
        assert_eq!(PriceOrder::from_param(None), PriceOrder::Asc);
    }

    #[test]
    fn test_search_condition_covers_fields_case_insensitively() {
        for field in ["title", "author", "genre"] {
            let substring = format!("string::lowercase({}) CONTAINS $q", field);
            let fuzzy = format!("{} ~ $q", field);
            assert!(SEARCH_CONDITION.contains(&substring));
            assert!(SEARCH_CONDITION.contains(&fuzzy));
        }
    }
}
