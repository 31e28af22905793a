use serde::{Deserialize, Serialize};

/// 统一成功响应：`{"success": true, "data": ...}`，message 按需附带
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            message: Some(message),
            ..Self::success(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_omitted_when_absent() {
        let body = serde_json::to_value(ApiResponse::success(1)).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": 1}));
    }

    #[test]
    fn test_message_field_present_when_set() {
        let body = serde_json::to_value(ApiResponse::success_with_message(
            (),
            "Message deleted".to_string(),
        ))
        .unwrap();
        assert_eq!(body["message"], "Message deleted");
        assert_eq!(body["success"], true);
    }
}
