use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

/// 关注关系是单向的：follower 关注 following
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    pub fn new(follower_id: &str, following_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            created_at: Utc::now(),
        }
    }
}
