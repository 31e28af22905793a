/// 用于处理 SurrealDB Thing ID 的反序列化辅助模块

use serde::{Deserialize, Deserializer};

/// 将 SurrealDB 记录 ID 统一反序列化为裸字符串 (例如 "book:⟨uuid⟩" -> "uuid")
pub mod thing_id {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IdValue {
            String(String),
            Thing {
                #[allow(dead_code)]
                tb: String,
                id: serde_json::Value,
            },
        }

        match IdValue::deserialize(deserializer)? {
            IdValue::String(s) => Ok(strip_record_prefix(&s)),
            IdValue::Thing { tb: _, id } => Ok(record_part_to_string(&id)),
        }
    }

    /// "table:⟨id⟩" 形式去掉表前缀和包围符号
    pub(super) fn strip_record_prefix(raw: &str) -> String {
        let id_part = match raw.split_once(':') {
            Some((_, rest)) => rest,
            None => raw,
        };
        id_part.trim_matches(|c| c == '⟨' || c == '⟩' || c == '`').to_string()
    }

    // Thing 的 id 部分在不同序列化路径下可能是字符串、数字或 {"String": "..."} 形式
    pub(super) fn record_part_to_string(id: &serde_json::Value) -> String {
        match id {
            serde_json::Value::String(s) => strip_record_prefix(s),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Object(map) => {
                if let Some(inner) = map.get("String").and_then(|v| v.as_str()) {
                    inner.to_string()
                } else if let Some(inner) = map.get("Number") {
                    inner.to_string()
                } else {
                    id.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::thing_id;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Record {
        #[serde(deserialize_with = "thing_id::deserialize")]
        id: String,
    }

    #[test]
    fn test_deserialize_plain_string() {
        let record: Record = serde_json::from_value(serde_json::json!({"id": "abc-123"})).unwrap();
        assert_eq!(record.id, "abc-123");
    }

    #[test]
    fn test_deserialize_prefixed_string() {
        let record: Record =
            serde_json::from_value(serde_json::json!({"id": "book:⟨abc-123⟩"})).unwrap();
        assert_eq!(record.id, "abc-123");
    }

    #[test]
    fn test_deserialize_thing_object() {
        let record: Record = serde_json::from_value(
            serde_json::json!({"id": {"tb": "book", "id": {"String": "abc-123"}}}),
        )
        .unwrap();
        assert_eq!(record.id, "abc-123");
    }

    #[test]
    fn test_deserialize_thing_with_plain_id() {
        let record: Record =
            serde_json::from_value(serde_json::json!({"id": {"tb": "user_profile", "id": "u-1"}}))
                .unwrap();
        assert_eq!(record.id, "u-1");
    }
}
