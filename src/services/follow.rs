use crate::{
    error::{AppError, Result},
    models::{
        follow::Follow,
        user::{UserProfile, UserProfileResponse},
    },
    services::database::{Database, PaginatedResult},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// 关注关系服务
#[derive(Clone)]
pub struct FollowService {
    db: Arc<Database>,
}

impl FollowService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 关注用户
    pub async fn follow_user(&self, follower_id: &str, following_id: &str) -> Result<Follow> {
        debug!("User {} following user {}", follower_id, following_id);

        if follower_id == following_id {
            return Err(AppError::bad_request("Cannot follow yourself"));
        }

        // 检查目标用户是否存在
        let target = self
            .db
            .get_by_id::<UserProfile>("user_profile", following_id)
            .await?;
        if target.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        // 检查是否已经关注
        if self.is_following(follower_id, following_id).await? {
            return Err(AppError::conflict("Already following this user"));
        }

        let follow = Follow::new(follower_id, following_id);
        let created = self.db.create("follow", &follow).await?;

        // 更新双方的关注计数
        self.update_follow_counts(follower_id, following_id).await?;

        info!("User {} now follows user {}", follower_id, following_id);
        Ok(created)
    }

    /// 取消关注
    pub async fn unfollow_user(&self, follower_id: &str, following_id: &str) -> Result<()> {
        debug!("User {} unfollowing user {}", follower_id, following_id);

        if !self.is_following(follower_id, following_id).await? {
            return Err(AppError::not_found("Not following this user"));
        }

        self.db
            .query_with_params(
                "DELETE follow WHERE follower_id = $follower_id AND following_id = $following_id",
                json!({
                    "follower_id": follower_id,
                    "following_id": following_id
                }),
            )
            .await?;

        self.update_follow_counts(follower_id, following_id).await?;

        info!("User {} unfollowed user {}", follower_id, following_id);
        Ok(())
    }

    /// 检查关注关系
    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM follow WHERE follower_id = $follower_id AND following_id = $following_id LIMIT 1",
                json!({
                    "follower_id": follower_id,
                    "following_id": following_id
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    /// 获取关注者列表（关注 user_id 的用户）
    pub async fn get_followers(
        &self,
        user_id: &str,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<UserProfileResponse>> {
        debug!("Getting followers for user: {}", user_id);
        self.list_related_profiles(user_id, "following_id", "follower_id", page, per_page)
            .await
    }

    /// 获取关注列表（user_id 关注的用户）
    pub async fn get_following(
        &self,
        user_id: &str,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<UserProfileResponse>> {
        debug!("Getting following for user: {}", user_id);
        self.list_related_profiles(user_id, "follower_id", "following_id", page, per_page)
            .await
    }

    // 分两步取关系页再取档案，SurrealDB 不支持 JOIN
    async fn list_related_profiles(
        &self,
        user_id: &str,
        match_field: &str,
        select_field: &str,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<UserProfileResponse>> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let count_query = format!(
            "SELECT count() AS total FROM follow WHERE {} = $user_id GROUP ALL",
            match_field
        );
        let mut response = self
            .db
            .query_with_params(&count_query, json!({ "user_id": user_id }))
            .await?;
        let total_row: Option<Value> = response.take(0)?;
        let total = total_row
            .as_ref()
            .and_then(|v| v.get("total"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let page_query = format!(
            "SELECT * FROM follow WHERE {} = $user_id ORDER BY created_at DESC LIMIT $limit START $offset",
            match_field
        );
        let mut response = self
            .db
            .query_with_params(
                &page_query,
                json!({
                    "user_id": user_id,
                    "limit": per_page,
                    "offset": offset
                }),
            )
            .await?;
        let follows: Vec<Follow> = response.take(0)?;

        let mut data = Vec::with_capacity(follows.len());
        for follow in &follows {
            let related_id = if select_field == "follower_id" {
                &follow.follower_id
            } else {
                &follow.following_id
            };
            if let Some(profile) = self
                .db
                .get_by_id::<UserProfile>("user_profile", related_id)
                .await?
            {
                data.push(profile.to_response());
            }
        }

        Ok(PaginatedResult::new(data, total, page, per_page))
    }

    // 按 follow 表重新统计双方计数，避免增量更新漂移
    async fn update_follow_counts(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                LET $following = (SELECT count() FROM follow WHERE follower_id = $follower_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('user_profile', $follower_id) SET following_count = $following, updated_at = time::now();
                LET $followers = (SELECT count() FROM follow WHERE following_id = $following_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('user_profile', $following_id) SET follower_count = $followers, updated_at = time::now();
                "#,
                json!({
                    "follower_id": follower_id,
                    "following_id": following_id
                }),
            )
            .await?;
        Ok(())
    }
}
