use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        post::{CreatePostRequest, Post, PostLike, PostWithAuthor, UpdatePostRequest},
        user::UserProfile,
    },
    services::database::{Database, PaginatedResult},
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// 动态流服务
#[derive(Clone)]
pub struct PostService {
    db: Arc<Database>,
    config: Arc<Config>,
}

impl PostService {
    pub async fn new(db: Arc<Database>, config: Arc<Config>) -> Result<Self> {
        Ok(Self { db, config })
    }

    /// 发布动态
    pub async fn create_post(&self, author_id: &str, request: CreatePostRequest) -> Result<Post> {
        debug!("Creating post for user: {}", author_id);

        request.validate().map_err(AppError::ValidatorError)?;

        let post = Post::new(author_id, request);
        let created = self.db.create("post", &post).await?;

        info!("User {} created post {}", author_id, created.id);
        Ok(created)
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Post> {
        self.db
            .get_by_id::<Post>("post", post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    /// 带作者信息的单条动态
    pub async fn get_post_with_author(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<PostWithAuthor> {
        let post = self.get_post(post_id).await?;
        self.decorate(post, viewer_id).await
    }

    /// 动态流，按发布时间倒序
    pub async fn list_posts(
        &self,
        viewer_id: Option<&str>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<PostWithAuthor>> {
        self.run_listing(&[], Map::new(), viewer_id, page, per_page)
            .await
    }

    /// 某个用户发布的动态
    pub async fn list_posts_by_user(
        &self,
        user_id: &str,
        viewer_id: Option<&str>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<PostWithAuthor>> {
        let mut params = Map::new();
        params.insert("author_id".to_string(), json!(user_id));
        self.run_listing(
            &["author_id = $author_id".to_string()],
            params,
            viewer_id,
            page,
            per_page,
        )
        .await
    }

    /// 修改动态，仅限作者
    pub async fn update_post(
        &self,
        post_id: &str,
        author_id: &str,
        request: UpdatePostRequest,
    ) -> Result<Post> {
        request.validate().map_err(AppError::ValidatorError)?;

        let post = self.get_post(post_id).await?;
        if !post.is_author(author_id) {
            return Err(AppError::Authorization(
                "You are not authorized to update this post".to_string(),
            ));
        }

        let mut updates = Map::new();
        if let Some(content) = request.content {
            updates.insert("content".to_string(), json!(content));
        }
        if let Some(image_url) = request.image_url {
            updates.insert("image_url".to_string(), json!(image_url));
        }
        if let Some(video_url) = request.video_url {
            updates.insert("video_url".to_string(), json!(video_url));
        }
        updates.insert("updated_at".to_string(), json!(chrono::Utc::now()));

        let updated = self
            .db
            .update_by_id_with_json::<Post>("post", post_id, Value::Object(updates))
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;

        info!("Updated post: {}", post_id);
        Ok(updated)
    }

    /// 删除动态及其点赞、评论，仅限作者
    pub async fn delete_post(&self, post_id: &str, author_id: &str) -> Result<()> {
        let post = self.get_post(post_id).await?;
        if !post.is_author(author_id) {
            return Err(AppError::Authorization(
                "You are not authorized to delete this post".to_string(),
            ));
        }

        // 连同评论树和点赞一起清理
        self.db
            .query_with_params(
                r#"
                DELETE inner_comment_like WHERE inner_comment_id IN (SELECT VALUE meta::id(id) FROM inner_comment WHERE comment_id IN (SELECT VALUE meta::id(id) FROM comment WHERE post_id = $post_id));
                DELETE inner_comment WHERE comment_id IN (SELECT VALUE meta::id(id) FROM comment WHERE post_id = $post_id);
                DELETE comment_like WHERE comment_id IN (SELECT VALUE meta::id(id) FROM comment WHERE post_id = $post_id);
                DELETE comment WHERE post_id = $post_id;
                DELETE post_like WHERE post_id = $post_id;
                "#,
                json!({ "post_id": post_id }),
            )
            .await?;
        self.db.delete_by_id("post", post_id).await?;

        info!("Deleted post: {}", post_id);
        Ok(())
    }

    /// 点赞动态；重复点赞返回 409
    pub async fn like_post(&self, post_id: &str, user_id: &str) -> Result<Post> {
        self.get_post(post_id).await?;

        if self.like_exists(post_id, user_id).await? {
            return Err(AppError::conflict("You have already liked this post"));
        }

        let like = PostLike::new(user_id, post_id);
        self.db.create("post_like", &like).await?;

        self.recompute_like_count(post_id).await
    }

    /// 取消点赞
    pub async fn unlike_post(&self, post_id: &str, user_id: &str) -> Result<Post> {
        self.get_post(post_id).await?;

        if !self.like_exists(post_id, user_id).await? {
            return Err(AppError::not_found("You have not liked this post"));
        }

        self.db
            .query_with_params(
                "DELETE post_like WHERE post_id = $post_id AND user_id = $user_id",
                json!({
                    "post_id": post_id,
                    "user_id": user_id
                }),
            )
            .await?;

        self.recompute_like_count(post_id).await
    }

    async fn like_exists(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM post_like WHERE post_id = $post_id AND user_id = $user_id LIMIT 1",
                json!({
                    "post_id": post_id,
                    "user_id": user_id
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn decorate(&self, post: Post, viewer_id: Option<&str>) -> Result<PostWithAuthor> {
        let author = self
            .db
            .get_by_id::<UserProfile>("user_profile", &post.author_id)
            .await?;
        let (author_name, author_avatar) = match author {
            Some(profile) => (profile.name, profile.avatar_url),
            None => ("[deleted]".to_string(), None),
        };

        let you_liked = match viewer_id {
            Some(viewer) => self.like_exists(&post.id, viewer).await?,
            None => false,
        };

        Ok(PostWithAuthor {
            post,
            author_name,
            author_avatar,
            you_liked,
        })
    }

    // 点赞数按 post_like 表重新统计
    async fn recompute_like_count(&self, post_id: &str) -> Result<Post> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                LET $count = (SELECT count() FROM post_like WHERE post_id = $post_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('post', $post_id) SET like_count = $count, updated_at = time::now() RETURN AFTER;
                "#,
                json!({ "post_id": post_id }),
            )
            .await?;
        let updated: Vec<Post> = response.take(1)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    async fn run_listing(
        &self,
        conditions: &[String],
        mut params: Map<String, Value>,
        viewer_id: Option<&str>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<PaginatedResult<PostWithAuthor>> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(self.config.default_feed_per_page as i64)
            .clamp(1, self.config.max_page_size as i64);
        let offset = (page - 1) * per_page;

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!(
            "SELECT count() AS total FROM post {} GROUP ALL",
            where_clause
        );
        let mut count_response = self
            .db
            .query_with_params(&count_query, Value::Object(params.clone()))
            .await?;
        let total_row: Option<Value> = count_response.take(0)?;
        let total = total_row
            .as_ref()
            .and_then(|v| v.get("total"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        params.insert("limit".to_string(), json!(per_page));
        params.insert("offset".to_string(), json!(offset));

        let data_query = format!(
            "SELECT * FROM post {} ORDER BY created_at DESC LIMIT $limit START $offset",
            where_clause
        );
        let mut response = self
            .db
            .query_with_params(&data_query, Value::Object(params))
            .await?;
        let posts: Vec<Post> = response.take(0)?;

        let mut data = Vec::with_capacity(posts.len());
        for post in posts {
            data.push(self.decorate(post, viewer_id).await?);
        }

        Ok(PaginatedResult::new(data, total, page, per_page))
    }
}
