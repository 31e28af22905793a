use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

/// 图书摘要文件，独立于图书本身的生命周期管理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSummary {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub book_id: String,
    pub title: Option<String>,
    pub file_path: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateSummaryRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub id: String,
    pub book_id: String,
    pub title: Option<String>,
    pub file_name: String,
    pub download_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookSummary {
    pub fn new(book_id: &str, title: Option<String>, file_path: String, file_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            book_id: book_id.to_string(),
            title,
            file_path,
            file_name,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_response(&self) -> SummaryResponse {
        SummaryResponse {
            id: self.id.clone(),
            book_id: self.book_id.clone(),
            title: self.title.clone(),
            file_name: self.file_name.clone(),
            download_url: format!("/api/summaries/{}/download", self.id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
