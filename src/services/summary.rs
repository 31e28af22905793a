use crate::{
    error::{AppError, Result},
    models::{book::Book, summary::BookSummary},
    services::database::Database,
    services::storage::{StorageService, SUMMARY_EXTENSIONS},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// 图书摘要文件服务
#[derive(Clone)]
pub struct SummaryService {
    db: Arc<Database>,
    storage: Arc<StorageService>,
}

impl SummaryService {
    pub async fn new(db: Arc<Database>, storage: Arc<StorageService>) -> Result<Self> {
        Ok(Self { db, storage })
    }

    /// 上传摘要文件并挂到书目下
    pub async fn upload_summary(
        &self,
        book_id: &str,
        title: Option<String>,
        original_name: &str,
        data: &[u8],
    ) -> Result<BookSummary> {
        debug!("Uploading summary for book {}", book_id);

        let book = self.db.get_by_id::<Book>("book", book_id).await?;
        if book.is_none() {
            return Err(AppError::bad_request("Book not found"));
        }

        let stored = self
            .storage
            .save("summaries", original_name, SUMMARY_EXTENSIONS, data)
            .await?;

        let summary = BookSummary::new(book_id, title, stored.relative_path, stored.file_name);
        let created = self.db.create("book_summary", &summary).await?;

        info!("Uploaded summary {} for book {}", created.id, book_id);
        Ok(created)
    }

    pub async fn get_summary(&self, summary_id: &str) -> Result<BookSummary> {
        self.db
            .get_by_id::<BookSummary>("book_summary", summary_id)
            .await?
            .ok_or_else(|| AppError::not_found("Summary not found"))
    }

    /// 某本书名下的全部摘要
    pub async fn list_summaries_for_book(&self, book_id: &str) -> Result<Vec<BookSummary>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM book_summary WHERE book_id = $book_id ORDER BY created_at DESC",
                json!({ "book_id": book_id }),
            )
            .await?;
        let summaries: Vec<BookSummary> = response.take(0)?;
        Ok(summaries)
    }

    /// 更新标题，可同时替换文件
    pub async fn update_summary(
        &self,
        summary_id: &str,
        title: Option<String>,
        replacement: Option<(&str, &[u8])>,
    ) -> Result<BookSummary> {
        let summary = self.get_summary(summary_id).await?;

        let mut updates = serde_json::Map::new();
        if let Some(title) = title {
            updates.insert("title".to_string(), json!(title));
        }

        if let Some((original_name, data)) = replacement {
            let stored = self
                .storage
                .save("summaries", original_name, SUMMARY_EXTENSIONS, data)
                .await?;
            self.storage.delete(&summary.file_path).await?;
            updates.insert("file_path".to_string(), json!(stored.relative_path));
            updates.insert("file_name".to_string(), json!(stored.file_name));
        }

        updates.insert("updated_at".to_string(), json!(chrono::Utc::now()));

        let updated = self
            .db
            .update_by_id_with_json::<BookSummary>(
                "book_summary",
                summary_id,
                serde_json::Value::Object(updates),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Summary not found"))?;

        info!("Updated summary: {}", summary_id);
        Ok(updated)
    }

    /// 删除摘要与其文件
    pub async fn delete_summary(&self, summary_id: &str) -> Result<()> {
        let summary = self.get_summary(summary_id).await?;

        self.storage.delete(&summary.file_path).await?;
        self.db.delete_by_id("book_summary", summary_id).await?;

        info!("Deleted summary: {}", summary_id);
        Ok(())
    }

    /// 打开摘要文件用于下载
    pub async fn open_summary(
        &self,
        summary_id: &str,
    ) -> Result<(tokio::fs::File, u64, BookSummary)> {
        let summary = self.get_summary(summary_id).await?;
        let (file, size) = self.storage.open(&summary.file_path).await?;
        Ok((file, size, summary))
    }
}
