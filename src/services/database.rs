use crate::config::Config;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Debug;
use surrealdb::engine::remote::http::{Client, Http, Https};
use surrealdb::opt::auth::Root;
use surrealdb::{Response, Surreal};
use tracing::{debug, error, info};
use uuid::Uuid;

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    pub client: Surreal<Client>,
    pub config: Config,
}

impl Database {
    /// 创建新的数据库实例
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection to {}", config.database_url);

        let address = config
            .database_url
            .trim_start_matches("http://")
            .trim_start_matches("https://");

        let client = if config.database_url.starts_with("https://") {
            Surreal::new::<Https>(address).await?
        } else {
            Surreal::new::<Http>(address).await?
        };

        client
            .signin(Root {
                username: &config.database_username,
                password: &config.database_password,
            })
            .await?;

        client
            .use_ns(&config.database_namespace)
            .use_db(&config.database_name)
            .await?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match self.query("INFO FOR DB").await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(e)
            }
        }
    }

    /// 执行原始SQL查询
    pub async fn query(&self, sql: &str) -> Result<Response> {
        self.client.query(sql).await.map_err(AppError::from)
    }

    /// 执行带参数的查询
    pub async fn query_with_params<P>(&self, sql: &str, params: P) -> Result<Response>
    where
        P: Serialize,
    {
        self.client
            .query(sql)
            .bind(params)
            .await
            .map_err(AppError::from)
    }

    /// 创建记录。数据中的 id 字段用作记录 ID，缺省时生成 UUID
    pub async fn create<T>(&self, table: &str, data: T) -> Result<T>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        let mut content = serde_json::to_value(&data)?;
        let id = extract_record_id(&mut content).unwrap_or_else(|| Uuid::new_v4().to_string());

        debug!("Creating record {}:{}", table, id);

        let mut response = self
            .query_with_params(
                "CREATE type::thing($tb, $id) CONTENT $data",
                json!({
                    "tb": table,
                    "id": id,
                    "data": content
                }),
            )
            .await?;

        let created: Vec<T> = response.take(0)?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Failed to create record".to_string()))
    }

    /// 通过ID获取单个记录
    pub async fn get_by_id<T>(&self, table: &str, id: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        // 获取纯 ID（不带 table 前缀）
        let prefix = format!("{}:", table);
        let pure_id = id.strip_prefix(&prefix).unwrap_or(id);

        let mut response = self
            .query_with_params(
                "SELECT * FROM type::thing($tb, $id)",
                json!({
                    "tb": table,
                    "id": pure_id
                }),
            )
            .await?;

        let results: Vec<T> = response.take(0)?;
        Ok(results.into_iter().next())
    }

    /// 通过ID使用JSON数据合并更新记录并返回更新后的内容
    pub async fn update_by_id_with_json<T>(
        &self,
        table: &str,
        id: &str,
        updates: serde_json::Value,
    ) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        let mut response = self
            .query_with_params(
                "UPDATE type::thing($tb, $id) MERGE $updates RETURN AFTER",
                json!({
                    "tb": table,
                    "id": id,
                    "updates": updates
                }),
            )
            .await?;

        let results: Vec<T> = response.take(0)?;
        Ok(results.into_iter().next())
    }

    /// 通过ID删除记录
    pub async fn delete_by_id(&self, table: &str, id: &str) -> Result<()> {
        self.query_with_params(
            "DELETE type::thing($tb, $id)",
            json!({
                "tb": table,
                "id": id
            }),
        )
        .await?;
        Ok(())
    }

    /// 按单个字段查找第一条匹配记录
    pub async fn find_one<T>(&self, table: &str, field: &str, value: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        // table 和 field 来自调用方代码，不接受用户输入
        let sql = format!("SELECT * FROM {} WHERE {} = $value LIMIT 1", table, field);
        let mut response = self
            .query_with_params(&sql, json!({ "value": value }))
            .await?;

        let results: Vec<T> = response.take(0)?;
        Ok(results.into_iter().next())
    }
}

/// 从序列化内容中取出字符串 id 字段，供 CREATE 语句作为记录 ID 使用
fn extract_record_id(content: &mut serde_json::Value) -> Option<String> {
    let id = content.as_object_mut()?.remove("id")?;
    match id {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// 分页结果结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResult<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            data,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_record_id_removes_id_field() {
        let mut content = json!({"id": "abc-123", "title": "x"});
        assert_eq!(extract_record_id(&mut content), Some("abc-123".to_string()));
        assert!(content.get("id").is_none());
        assert_eq!(content["title"], "x");
    }

    #[test]
    fn test_extract_record_id_ignores_empty_and_missing() {
        let mut empty = json!({"id": "", "title": "x"});
        assert_eq!(extract_record_id(&mut empty), None);

        let mut missing = json!({"title": "x"});
        assert_eq!(extract_record_id(&mut missing), None);
    }

    #[test]
    fn test_paginated_result_page_math() {
        let empty: PaginatedResult<i32> = PaginatedResult::new(vec![], 0, 1, 4);
        assert_eq!(empty.total_pages, 0);

        // 9 条记录按每页 4 条 -> 3 页
        let partial = PaginatedResult::new(vec![1, 2, 3, 4], 9, 1, 4);
        assert_eq!(partial.total_pages, 3);

        // 恰好整页
        let exact = PaginatedResult::new(vec![1, 2, 3, 4], 8, 2, 4);
        assert_eq!(exact.total_pages, 2);
    }
}
