use crate::{
    error::{AppError, Result},
    models::{
        comment::{
            Comment, CommentLike, CommentWithAuthor, CreateCommentRequest,
            CreateInnerCommentRequest, InnerComment, InnerCommentLike, InnerCommentWithAuthor,
            UpdateCommentRequest,
        },
        post::Post,
        user::UserProfile,
    },
    services::database::Database,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// 评论服务，覆盖动态评论与评论回复两级
#[derive(Clone)]
pub struct CommentService {
    db: Arc<Database>,
}

impl CommentService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    // ===== 评论 =====

    /// 发表评论并刷新动态的评论计数
    pub async fn create_comment(
        &self,
        author_id: &str,
        request: CreateCommentRequest,
    ) -> Result<Comment> {
        debug!("User {} commenting on post {}", author_id, request.post_id);

        request.validate().map_err(AppError::ValidatorError)?;

        let post = self.db.get_by_id::<Post>("post", &request.post_id).await?;
        if post.is_none() {
            return Err(AppError::not_found("Post not found"));
        }

        let comment = Comment::new(&request.post_id, author_id, request.content);
        let created = self.db.create("comment", &comment).await?;

        self.recompute_post_comment_count(&created.post_id).await?;

        info!("User {} commented on post {}", author_id, created.post_id);
        Ok(created)
    }

    pub async fn get_comment(&self, comment_id: &str) -> Result<Comment> {
        self.db
            .get_by_id::<Comment>("comment", comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))
    }

    /// 带作者信息的单条评论
    pub async fn get_comment_with_author(
        &self,
        comment_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<CommentWithAuthor> {
        let comment = self.get_comment(comment_id).await?;
        self.decorate_comment(comment, viewer_id).await
    }

    /// 某条动态下的评论，按时间正序
    pub async fn list_comments_for_post(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Vec<CommentWithAuthor>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM comment WHERE post_id = $post_id ORDER BY created_at ASC",
                json!({ "post_id": post_id }),
            )
            .await?;
        let comments: Vec<Comment> = response.take(0)?;

        let mut result = Vec::with_capacity(comments.len());
        for comment in comments {
            result.push(self.decorate_comment(comment, viewer_id).await?);
        }
        Ok(result)
    }

    /// 修改评论，仅限作者
    pub async fn update_comment(
        &self,
        comment_id: &str,
        author_id: &str,
        request: UpdateCommentRequest,
    ) -> Result<Comment> {
        request.validate().map_err(AppError::ValidatorError)?;

        let comment = self.get_comment(comment_id).await?;
        if !comment.is_author(author_id) {
            return Err(AppError::Authorization(
                "You are not authorized to update this comment".to_string(),
            ));
        }

        let updated = self
            .db
            .update_by_id_with_json::<Comment>(
                "comment",
                comment_id,
                json!({
                    "content": request.content,
                    "updated_at": chrono::Utc::now(),
                }),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;

        info!("Updated comment: {}", comment_id);
        Ok(updated)
    }

    /// 删除评论（连同回复与点赞），仅限作者
    pub async fn delete_comment(&self, comment_id: &str, author_id: &str) -> Result<()> {
        let comment = self.get_comment(comment_id).await?;
        if !comment.is_author(author_id) {
            return Err(AppError::Authorization(
                "You are not authorized to delete this comment".to_string(),
            ));
        }

        self.db
            .query_with_params(
                r#"
                DELETE inner_comment_like WHERE inner_comment_id IN (SELECT VALUE meta::id(id) FROM inner_comment WHERE comment_id = $comment_id);
                DELETE inner_comment WHERE comment_id = $comment_id;
                DELETE comment_like WHERE comment_id = $comment_id;
                "#,
                json!({ "comment_id": comment_id }),
            )
            .await?;
        self.db.delete_by_id("comment", comment_id).await?;

        self.recompute_post_comment_count(&comment.post_id).await?;

        info!("Deleted comment: {}", comment_id);
        Ok(())
    }

    /// 点赞评论；重复点赞返回 409
    pub async fn like_comment(&self, comment_id: &str, user_id: &str) -> Result<Comment> {
        self.get_comment(comment_id).await?;

        if self.comment_like_exists(comment_id, user_id).await? {
            return Err(AppError::conflict("You have already liked this comment"));
        }

        let like = CommentLike::new(user_id, comment_id);
        self.db.create("comment_like", &like).await?;

        self.recompute_comment_like_count(comment_id).await
    }

    /// 取消评论点赞
    pub async fn unlike_comment(&self, comment_id: &str, user_id: &str) -> Result<Comment> {
        self.get_comment(comment_id).await?;

        if !self.comment_like_exists(comment_id, user_id).await? {
            return Err(AppError::not_found("You have not liked this comment"));
        }

        self.db
            .query_with_params(
                "DELETE comment_like WHERE comment_id = $comment_id AND user_id = $user_id",
                json!({
                    "comment_id": comment_id,
                    "user_id": user_id
                }),
            )
            .await?;

        self.recompute_comment_like_count(comment_id).await
    }

    // ===== 回复 =====

    /// 回复评论并刷新回复计数
    pub async fn create_inner_comment(
        &self,
        comment_id: &str,
        author_id: &str,
        request: CreateInnerCommentRequest,
    ) -> Result<InnerComment> {
        debug!("User {} replying to comment {}", author_id, comment_id);

        request.validate().map_err(AppError::ValidatorError)?;

        self.get_comment(comment_id).await?;

        let reply = InnerComment::new(comment_id, author_id, request.content);
        let created = self.db.create("inner_comment", &reply).await?;

        self.recompute_inner_comment_count(comment_id).await?;

        info!("User {} replied to comment {}", author_id, comment_id);
        Ok(created)
    }

    pub async fn get_inner_comment(&self, inner_comment_id: &str) -> Result<InnerComment> {
        self.db
            .get_by_id::<InnerComment>("inner_comment", inner_comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Reply not found"))
    }

    /// 带作者信息的单条回复
    pub async fn get_inner_comment_with_author(
        &self,
        inner_comment_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<InnerCommentWithAuthor> {
        let reply = self.get_inner_comment(inner_comment_id).await?;
        self.decorate_inner_comment(reply, viewer_id).await
    }

    /// 某条评论下的回复，按时间正序
    pub async fn list_inner_comments(
        &self,
        comment_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Vec<InnerCommentWithAuthor>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM inner_comment WHERE comment_id = $comment_id ORDER BY created_at ASC",
                json!({ "comment_id": comment_id }),
            )
            .await?;
        let replies: Vec<InnerComment> = response.take(0)?;

        let mut result = Vec::with_capacity(replies.len());
        for reply in replies {
            result.push(self.decorate_inner_comment(reply, viewer_id).await?);
        }
        Ok(result)
    }

    /// 修改回复，仅限作者
    pub async fn update_inner_comment(
        &self,
        inner_comment_id: &str,
        author_id: &str,
        request: UpdateCommentRequest,
    ) -> Result<InnerComment> {
        request.validate().map_err(AppError::ValidatorError)?;

        let reply = self.get_inner_comment(inner_comment_id).await?;
        if !reply.is_author(author_id) {
            return Err(AppError::Authorization(
                "You are not authorized to update this reply".to_string(),
            ));
        }

        let updated = self
            .db
            .update_by_id_with_json::<InnerComment>(
                "inner_comment",
                inner_comment_id,
                json!({
                    "content": request.content,
                    "updated_at": chrono::Utc::now(),
                }),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Reply not found"))?;

        info!("Updated reply: {}", inner_comment_id);
        Ok(updated)
    }

    /// 删除回复，仅限作者
    pub async fn delete_inner_comment(
        &self,
        inner_comment_id: &str,
        author_id: &str,
    ) -> Result<()> {
        let reply = self.get_inner_comment(inner_comment_id).await?;
        if !reply.is_author(author_id) {
            return Err(AppError::Authorization(
                "You are not authorized to delete this reply".to_string(),
            ));
        }

        self.db
            .query_with_params(
                "DELETE inner_comment_like WHERE inner_comment_id = $inner_comment_id",
                json!({ "inner_comment_id": inner_comment_id }),
            )
            .await?;
        self.db
            .delete_by_id("inner_comment", inner_comment_id)
            .await?;

        self.recompute_inner_comment_count(&reply.comment_id).await?;

        info!("Deleted reply: {}", inner_comment_id);
        Ok(())
    }

    /// 点赞回复；重复点赞返回 409
    pub async fn like_inner_comment(
        &self,
        inner_comment_id: &str,
        user_id: &str,
    ) -> Result<InnerComment> {
        self.get_inner_comment(inner_comment_id).await?;

        if self
            .inner_comment_like_exists(inner_comment_id, user_id)
            .await?
        {
            return Err(AppError::conflict("You have already liked this reply"));
        }

        let like = InnerCommentLike::new(user_id, inner_comment_id);
        self.db.create("inner_comment_like", &like).await?;

        self.recompute_inner_comment_like_count(inner_comment_id)
            .await
    }

    /// 取消回复点赞
    pub async fn unlike_inner_comment(
        &self,
        inner_comment_id: &str,
        user_id: &str,
    ) -> Result<InnerComment> {
        self.get_inner_comment(inner_comment_id).await?;

        if !self
            .inner_comment_like_exists(inner_comment_id, user_id)
            .await?
        {
            return Err(AppError::not_found("You have not liked this reply"));
        }

        self.db
            .query_with_params(
                "DELETE inner_comment_like WHERE inner_comment_id = $inner_comment_id AND user_id = $user_id",
                json!({
                    "inner_comment_id": inner_comment_id,
                    "user_id": user_id
                }),
            )
            .await?;

        self.recompute_inner_comment_like_count(inner_comment_id)
            .await
    }

    // ===== 内部工具 =====

    async fn comment_like_exists(&self, comment_id: &str, user_id: &str) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM comment_like WHERE comment_id = $comment_id AND user_id = $user_id LIMIT 1",
                json!({
                    "comment_id": comment_id,
                    "user_id": user_id
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn inner_comment_like_exists(
        &self,
        inner_comment_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM inner_comment_like WHERE inner_comment_id = $inner_comment_id AND user_id = $user_id LIMIT 1",
                json!({
                    "inner_comment_id": inner_comment_id,
                    "user_id": user_id
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn decorate_comment(
        &self,
        comment: Comment,
        viewer_id: Option<&str>,
    ) -> Result<CommentWithAuthor> {
        let author = self
            .db
            .get_by_id::<UserProfile>("user_profile", &comment.author_id)
            .await?;
        let (author_name, author_avatar) = match author {
            Some(profile) => (profile.name, profile.avatar_url),
            None => ("[deleted]".to_string(), None),
        };

        let you_liked = match viewer_id {
            Some(viewer) => self.comment_like_exists(&comment.id, viewer).await?,
            None => false,
        };

        Ok(CommentWithAuthor {
            comment,
            author_name,
            author_avatar,
            you_liked,
        })
    }

    async fn decorate_inner_comment(
        &self,
        reply: InnerComment,
        viewer_id: Option<&str>,
    ) -> Result<InnerCommentWithAuthor> {
        let author = self
            .db
            .get_by_id::<UserProfile>("user_profile", &reply.author_id)
            .await?;
        let (author_name, author_avatar) = match author {
            Some(profile) => (profile.name, profile.avatar_url),
            None => ("[deleted]".to_string(), None),
        };

        let you_liked = match viewer_id {
            Some(viewer) => self.inner_comment_like_exists(&reply.id, viewer).await?,
            None => false,
        };

        Ok(InnerCommentWithAuthor {
            inner_comment: reply,
            author_name,
            author_avatar,
            you_liked,
        })
    }

    // 动态的评论数按 comment 表重新统计
    async fn recompute_post_comment_count(&self, post_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                LET $count = (SELECT count() FROM comment WHERE post_id = $post_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('post', $post_id) SET comment_count = $count, updated_at = time::now();
                "#,
                json!({ "post_id": post_id }),
            )
            .await?;
        Ok(())
    }

    // 评论的回复数按 inner_comment 表重新统计
    async fn recompute_inner_comment_count(&self, comment_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                LET $count = (SELECT count() FROM inner_comment WHERE comment_id = $comment_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('comment', $comment_id) SET inner_comment_count = $count, updated_at = time::now();
                "#,
                json!({ "comment_id": comment_id }),
            )
            .await?;
        Ok(())
    }

    async fn recompute_comment_like_count(&self, comment_id: &str) -> Result<Comment> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                LET $count = (SELECT count() FROM comment_like WHERE comment_id = $comment_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('comment', $comment_id) SET like_count = $count, updated_at = time::now() RETURN AFTER;
                "#,
                json!({ "comment_id": comment_id }),
            )
            .await?;
        let updated: Vec<Comment> = response.take(1)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Comment not found"))
    }

    async fn recompute_inner_comment_like_count(
        &self,
        inner_comment_id: &str,
    ) -> Result<InnerComment> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                LET $count = (SELECT count() FROM inner_comment_like WHERE inner_comment_id = $inner_comment_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('inner_comment', $inner_comment_id) SET like_count = $count, updated_at = time::now() RETURN AFTER;
                "#,
                json!({ "inner_comment_id": inner_comment_id }),
            )
            .await?;
        let updated: Vec<InnerComment> = response.take(1)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Reply not found"))
    }
}
