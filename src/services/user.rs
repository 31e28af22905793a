use crate::{
    error::{AppError, Result},
    models::user::{UpdateUserRequest, UserProfile},
    services::database::{Database, PaginatedResult},
    utils::validation,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// 用户资料服务
#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 按 ID 获取用户资料
    pub async fn get_user(&self, user_id: &str) -> Result<UserProfile> {
        self.db
            .get_by_id::<UserProfile>("user_profile", user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// 分页列出用户，可选按名称或邮箱模糊搜索
    pub async fn list_users(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
        search: Option<String>,
    ) -> Result<PaginatedResult<UserProfile>> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let (count_query, page_query, params) = if let Some(term) = search {
            (
                "SELECT count() AS total FROM user_profile WHERE name ~ $search OR email ~ $search GROUP ALL",
                r#"
                SELECT * FROM user_profile
                WHERE name ~ $search OR email ~ $search
                ORDER BY date_joined DESC
                LIMIT $limit START $offset
                "#,
                json!({
                    "search": term,
                    "limit": per_page,
                    "offset": offset
                }),
            )
        } else {
            (
                "SELECT count() AS total FROM user_profile GROUP ALL",
                r#"
                SELECT * FROM user_profile
                ORDER BY date_joined DESC
                LIMIT $limit START $offset
                "#,
                json!({
                    "limit": per_page,
                    "offset": offset
                }),
            )
        };

        let mut count_response = self
            .db
            .query_with_params(count_query, params.clone())
            .await?;
        let total_row: Option<Value> = count_response.take(0)?;
        let total = total_row
            .as_ref()
            .and_then(|v| v.get("total"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let mut response = self.db.query_with_params(page_query, params).await?;
        let profiles: Vec<UserProfile> = response.take(0)?;

        Ok(PaginatedResult::new(profiles, total, page, per_page))
    }

    /// 更新用户资料，仅限本人
    pub async fn update_user(
        &self,
        acting_user_id: &str,
        user_id: &str,
        request: UpdateUserRequest,
    ) -> Result<UserProfile> {
        debug!("Updating user profile: {}", user_id);

        if acting_user_id != user_id {
            return Err(AppError::forbidden(
                "You can only update your own profile",
            ));
        }

        request.validate().map_err(AppError::ValidatorError)?;

        if let Some(ref email) = request.email {
            validation::validate_email_format(email)?;
            // 换绑邮箱时检查唯一性
            if let Some(existing) = self
                .db
                .find_one::<UserProfile>("user_profile", "email", email)
                .await?
            {
                if existing.id != user_id {
                    return Err(AppError::conflict("Email is already registered"));
                }
            }
        }
        if let Some(ref phone) = request.phone {
            validation::validate_phone(phone)?;
        }

        let mut profile = self.get_user(user_id).await?;

        if let Some(identity) = request.identity {
            profile.identity = identity;
        }
        if let Some(name) = request.name {
            profile.name = name;
        }
        if let Some(email) = request.email {
            profile.email = email;
        }
        if let Some(bio) = request.bio {
            profile.bio = Some(bio);
        }
        if let Some(avatar_url) = request.avatar_url {
            profile.avatar_url = Some(avatar_url);
        }
        if let Some(birth_date) = request.birth_date {
            profile.birth_date = Some(birth_date);
        }
        if let Some(gender) = request.gender {
            profile.gender = Some(gender);
        }
        if let Some(phone) = request.phone {
            profile.phone = Some(phone);
        }
        if let Some(address) = request.address {
            profile.address = Some(address);
        }

        let updates = json!({
            "identity": profile.identity,
            "name": profile.name,
            "email": profile.email,
            "bio": profile.bio,
            "avatar_url": profile.avatar_url,
            "birth_date": profile.birth_date,
            "gender": profile.gender,
            "phone": profile.phone,
            "address": profile.address,
            "updated_at": chrono::Utc::now(),
        });

        let updated = self
            .db
            .update_by_id_with_json::<UserProfile>("user_profile", user_id, updates)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        info!("Updated user profile: {}", user_id);
        Ok(updated)
    }

    /// 删除用户，仅限本人；同时清理关注关系
    pub async fn delete_user(&self, acting_user_id: &str, user_id: &str) -> Result<()> {
        debug!("Deleting user: {}", user_id);

        if acting_user_id != user_id {
            return Err(AppError::forbidden(
                "You can only delete your own account",
            ));
        }

        // 确认存在后再删
        self.get_user(user_id).await?;

        self.db
            .query_with_params(
                "DELETE follow WHERE follower_id = $user_id OR following_id = $user_id",
                json!({ "user_id": user_id }),
            )
            .await?;
        self.db.delete_by_id("user_profile", user_id).await?;

        info!("Deleted user: {}", user_id);
        Ok(())
    }
}
