use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub like_count: i64,
    pub inner_comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 评论的二级回复
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerComment {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub comment_id: String,
    pub author_id: String,
    pub content: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentLike {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub user_id: String,
    pub comment_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerCommentLike {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub user_id: String,
    pub inner_comment_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 100))]
    pub post_id: String,

    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateInnerCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub you_liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerCommentWithAuthor {
    #[serde(flatten)]
    pub inner_comment: InnerComment,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub you_liked: bool,
}

impl Comment {
    pub fn new(post_id: &str, author_id: &str, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            content,
            like_count: 0,
            inner_comment_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_author(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }
}

impl InnerComment {
    pub fn new(comment_id: &str, author_id: &str, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            comment_id: comment_id.to_string(),
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

impl CommentLike {
    pub fn new(user_id: &str, comment_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            comment_id: comment_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl InnerCommentLike {
    pub fn new(user_id: &str, inner_comment_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            inner_comment_id: inner_comment_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_author_matches_creator_only() {
        let comment = Comment::new("post-1", "alice", "nice read".to_string());
        assert!(comment.is_author("alice"));
        assert!(!comment.is_author("bob"));

        let reply = InnerComment::new(&comment.id, "bob", "agreed".to_string());
        assert!(reply.is_author("bob"));
        assert!(!reply.is_author("alice"));
    }

    #[test]
    fn test_new_comment_starts_with_zero_counters() {
        let comment = Comment::new("post-1", "alice", "nice read".to_string());
        assert_eq!(comment.like_count, 0);
        assert_eq!(comment.inner_comment_count, 0);
    }
}
