use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

/// 阅读状态，三种状态相互独立
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingState {
    Read,
    Reading,
    ToRead,
}

impl ReadingState {
    /// URL 路径参数解析，同时接受连字符和下划线写法
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "read" => Some(Self::Read),
            "reading" => Some(Self::Reading),
            "to-read" | "to_read" => Some(Self::ToRead),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Reading => "reading",
            Self::ToRead => "to_read",
        }
    }

    /// 该状态在 book 表上对应的计数字段
    pub fn counter_field(&self) -> &'static str {
        match self {
            Self::Read => "readers_count",
            Self::Reading => "reading_count",
            Self::ToRead => "to_read_count",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfEntry {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub state: ReadingState,
    pub created_at: DateTime<Utc>,
}

impl ShelfEntry {
    pub fn new(user_id: &str, book_id: &str, state: ReadingState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            book_id: book_id.to_string(),
            state,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_param_accepts_both_spellings() {
        assert_eq!(ReadingState::from_param("read"), Some(ReadingState::Read));
        assert_eq!(
            ReadingState::from_param("reading"),
            Some(ReadingState::Reading)
        );
        assert_eq!(
            ReadingState::from_param("to-read"),
            Some(ReadingState::ToRead)
        );
        assert_eq!(
            ReadingState::from_param("to_read"),
            Some(ReadingState::ToRead)
        );
        assert_eq!(ReadingState::from_param("finished"), None);
    }

    #[test]
    fn test_counter_field_mapping() {
        assert_eq!(ReadingState::Read.counter_field(), "readers_count");
        assert_eq!(ReadingState::Reading.counter_field(), "reading_count");
        assert_eq!(ReadingState::ToRead.counter_field(), "to_read_count");
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReadingState::ToRead).unwrap(),
            "\"to_read\""
        );
    }
}
