use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub book_id: String,
    pub author_id: String,
    pub content: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 书评点赞记录，(user_id, review_id) 唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLike {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub user_id: String,
    pub review_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// 带作者信息的书评，you_liked 按当前查看者计算
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub you_liked: bool,
}

impl Review {
    pub fn new(book_id: &str, author_id: &str, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            book_id: book_id.to_string(),
            author_id: author_id.to_string(),
            content,
            like_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_author(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }
}

impl ReviewLike {
    pub fn new(user_id: &str, review_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            review_id: review_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_author_matches_creator_only() {
        let review = Review::new("book-1", "alice", "a slow start, strong finish".to_string());
        assert!(review.is_author("alice"));
        assert!(!review.is_author("bob"));
    }
}
