use crate::{
    error::{AppError, Result},
    models::{
        book::Book,
        shelf::{ReadingState, ShelfEntry},
    },
    services::database::{Database, PaginatedResult},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// 书架服务，维护用户与书目的阅读状态
#[derive(Clone)]
pub struct ShelfService {
    db: Arc<Database>,
}

impl ShelfService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 把书目加入某个阅读状态；同一状态重复加入返回 409
    pub async fn add_to_shelf(
        &self,
        user_id: &str,
        book_id: &str,
        state: ReadingState,
    ) -> Result<ShelfEntry> {
        debug!(
            "User {} shelving book {} as {}",
            user_id,
            book_id,
            state.as_str()
        );

        let book = self
            .db
            .get_by_id::<Book>("book", book_id)
            .await?;
        if book.is_none() {
            return Err(AppError::not_found("Book not found"));
        }

        if self.entry_exists(user_id, book_id, state).await? {
            return Err(AppError::conflict("Book is already on this shelf"));
        }

        let entry = ShelfEntry::new(user_id, book_id, state);
        let created = self.db.create("book_shelf", &entry).await?;

        self.recompute_counter(book_id, state).await?;

        info!(
            "User {} shelved book {} as {}",
            user_id,
            book_id,
            state.as_str()
        );
        Ok(created)
    }

    /// 把书目移出某个阅读状态
    pub async fn remove_from_shelf(
        &self,
        user_id: &str,
        book_id: &str,
        state: ReadingState,
    ) -> Result<()> {
        debug!(
            "User {} unshelving book {} from {}",
            user_id,
            book_id,
            state.as_str()
        );

        if !self.entry_exists(user_id, book_id, state).await? {
            return Err(AppError::not_found("Book is not on this shelf"));
        }

        self.db
            .query_with_params(
                "DELETE book_shelf WHERE user_id = $user_id AND book_id = $book_id AND state = $state",
                json!({
                    "user_id": user_id,
                    "book_id": book_id,
                    "state": state.as_str()
                }),
            )
            .await?;

        self.recompute_counter(book_id, state).await?;

        info!(
            "User {} removed book {} from {}",
            user_id,
            book_id,
            state.as_str()
        );
        Ok(())
    }

    /// 当前用户某个状态下的书目
    pub async fn list_shelf(
        &self,
        user_id: &str,
        state: ReadingState,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<Book>> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut count_response = self
            .db
            .query_with_params(
                "SELECT count() AS total FROM book_shelf WHERE user_id = $user_id AND state = $state GROUP ALL",
                json!({
                    "user_id": user_id,
                    "state": state.as_str()
                }),
            )
            .await?;
        let total_row: Option<Value> = count_response.take(0)?;
        let total = total_row
            .as_ref()
            .and_then(|v| v.get("total"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let mut response = self
            .db
            .query_with_params(
                r#"
                SELECT * FROM book_shelf
                WHERE user_id = $user_id AND state = $state
                ORDER BY created_at DESC
                LIMIT $limit START $offset
                "#,
                json!({
                    "user_id": user_id,
                    "state": state.as_str(),
                    "limit": per_page,
                    "offset": offset
                }),
            )
            .await?;
        let entries: Vec<ShelfEntry> = response.take(0)?;

        let mut data = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Some(book) = self.db.get_by_id::<Book>("book", &entry.book_id).await? {
                data.push(book);
            }
        }

        Ok(PaginatedResult::new(data, total, page, per_page))
    }

    async fn entry_exists(
        &self,
        user_id: &str,
        book_id: &str,
        state: ReadingState,
    ) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM book_shelf WHERE user_id = $user_id AND book_id = $book_id AND state = $state LIMIT 1",
                json!({
                    "user_id": user_id,
                    "book_id": book_id,
                    "state": state.as_str()
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    // 从 book_shelf 表重新统计对应计数
    async fn recompute_counter(&self, book_id: &str, state: ReadingState) -> Result<()> {
        let query = format!(
            r#"
            LET $count = (SELECT count() FROM book_shelf WHERE book_id = $book_id AND state = $state GROUP ALL)[0].count OR 0;
            UPDATE type::thing('book', $book_id) SET {} = $count, updated_at = time::now();
            "#,
            state.counter_field()
        );
        self.db
            .query_with_params(
                &query,
                json!({
                    "book_id": book_id,
                    "state": state.as_str()
                }),
            )
            .await?;
        Ok(())
    }
}
