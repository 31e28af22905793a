use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostLike {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,

    #[validate(url)]
    pub image_url: Option<String>,

    #[validate(url)]
    pub video_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: Option<String>,

    #[validate(url)]
    pub image_url: Option<String>,

    #[validate(url)]
    pub video_url: Option<String>,
}

/// 动态列表项，you_liked 按当前查看者即时计算，不落库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub you_liked: bool,
}

impl Post {
    pub fn new(author_id: &str, request: CreatePostRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            content: request.content,
            image_url: request.image_url,
            video_url: request.video_url,
            like_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_author(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }
}

impl PostLike {
    pub fn new(user_id: &str, post_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_post_request_validation() {
        let request = CreatePostRequest {
            content: "Just finished a great book".to_string(),
            image_url: None,
            video_url: None,
        };
        assert!(validator::Validate::validate(&request).is_ok());

        let empty = CreatePostRequest {
            content: String::new(),
            image_url: None,
            video_url: None,
        };
        assert!(validator::Validate::validate(&empty).is_err());

        let bad_url = CreatePostRequest {
            content: "hello".to_string(),
            image_url: Some("not a url".to_string()),
            video_url: None,
        };
        assert!(validator::Validate::validate(&bad_url).is_err());
    }

    #[test]
    fn test_new_post_starts_with_zero_counters() {
        let post = Post::new(
            "user-1",
            CreatePostRequest {
                content: "hello".to_string(),
                image_url: None,
                video_url: None,
            },
        );
        assert_eq!(post.like_count, 0);
        assert_eq!(post.comment_count, 0);
    }

    #[test]
    fn test_is_author_matches_creator_only() {
        let post = Post::new(
            "user-1",
            CreatePostRequest {
                content: "hello".to_string(),
                image_url: None,
                video_url: None,
            },
        );
        assert!(post.is_author("user-1"));
        assert!(!post.is_author("user-2"));
    }
}
