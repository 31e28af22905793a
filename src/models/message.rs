use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(length(min = 1, max = 100))]
    pub receiver_id: String,

    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateMessageRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

/// 私信查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct MessageQuery {
    /// 只看与某个用户之间的往来
    pub with: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl Message {
    pub fn new(sender_id: &str, receiver_id: &str, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content,
            created_at: now,
            updated_at: now,
        }
    }

    /// 只有收发双方可以查看私信
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_involves_participants_only() {
        let message = Message::new("alice", "bob", "hi".to_string());
        assert!(message.involves("alice"));
        assert!(message.involves("bob"));
        assert!(!message.involves("carol"));
    }
}
