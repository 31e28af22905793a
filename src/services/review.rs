use crate::{
    error::{AppError, Result},
    models::{
        book::Book,
        review::{CreateReviewRequest, Review, ReviewLike, ReviewWithAuthor, UpdateReviewRequest},
        user::UserProfile,
    },
    services::database::Database,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// 书评服务
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<Database>,
}

impl ReviewService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 发表书评并刷新书目的书评计数
    pub async fn create_review(
        &self,
        book_id: &str,
        author_id: &str,
        request: CreateReviewRequest,
    ) -> Result<Review> {
        debug!("User {} reviewing book {}", author_id, book_id);

        request.validate().map_err(AppError::ValidatorError)?;

        let book = self.db.get_by_id::<Book>("book", book_id).await?;
        if book.is_none() {
            return Err(AppError::not_found("Book not found"));
        }

        let review = Review::new(book_id, author_id, request.content);
        let created = self.db.create("book_review", &review).await?;

        self.recompute_reviews_count(book_id).await?;

        info!("User {} reviewed book {}", author_id, book_id);
        Ok(created)
    }

    pub async fn get_review(&self, review_id: &str) -> Result<Review> {
        self.db
            .get_by_id::<Review>("book_review", review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))
    }

    /// 带作者信息的单条书评
    pub async fn get_review_with_author(
        &self,
        review_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<ReviewWithAuthor> {
        let review = self.get_review(review_id).await?;
        self.decorate(review, viewer_id).await
    }

    /// 某本书的书评，按点赞数倒序
    pub async fn list_reviews_for_book(
        &self,
        book_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Vec<ReviewWithAuthor>> {
        debug!("Listing reviews for book {}", book_id);

        let mut response = self
            .db
            .query_with_params(
                r#"
                SELECT * FROM book_review
                WHERE book_id = $book_id
                ORDER BY like_count DESC, created_at DESC
                "#,
                json!({ "book_id": book_id }),
            )
            .await?;
        let reviews: Vec<Review> = response.take(0)?;

        let mut result = Vec::with_capacity(reviews.len());
        for review in reviews {
            result.push(self.decorate(review, viewer_id).await?);
        }
        Ok(result)
    }

    /// 修改书评，仅限作者
    pub async fn update_review(
        &self,
        review_id: &str,
        author_id: &str,
        request: UpdateReviewRequest,
    ) -> Result<Review> {
        request.validate().map_err(AppError::ValidatorError)?;

        let review = self.get_review(review_id).await?;
        if !review.is_author(author_id) {
            return Err(AppError::Authorization(
                "Only the review author can update this review".to_string(),
            ));
        }

        let updated = self
            .db
            .update_by_id_with_json::<Review>(
                "book_review",
                review_id,
                json!({
                    "content": request.content,
                    "updated_at": chrono::Utc::now(),
                }),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))?;

        info!("Updated review: {}", review_id);
        Ok(updated)
    }

    /// 删除书评及其点赞，仅限作者
    pub async fn delete_review(&self, review_id: &str, author_id: &str) -> Result<()> {
        let review = self.get_review(review_id).await?;
        if !review.is_author(author_id) {
            return Err(AppError::Authorization(
                "Only the review author can delete this review".to_string(),
            ));
        }

        self.db
            .query_with_params(
                "DELETE review_like WHERE review_id = $review_id",
                json!({ "review_id": review_id }),
            )
            .await?;
        self.db.delete_by_id("book_review", review_id).await?;

        self.recompute_reviews_count(&review.book_id).await?;

        info!("Deleted review: {}", review_id);
        Ok(())
    }

    /// 点赞书评；重复点赞返回 409
    pub async fn like_review(&self, review_id: &str, user_id: &str) -> Result<Review> {
        let review = self.get_review(review_id).await?;

        if self.like_exists(review_id, user_id).await? {
            return Err(AppError::conflict("You have already liked this review"));
        }

        let like = ReviewLike::new(user_id, review_id);
        self.db.create("review_like", &like).await?;

        self.recompute_like_count(&review.id).await
    }

    /// 取消点赞
    pub async fn unlike_review(&self, review_id: &str, user_id: &str) -> Result<Review> {
        let review = self.get_review(review_id).await?;

        if !self.like_exists(review_id, user_id).await? {
            return Err(AppError::not_found("You have not liked this review"));
        }

        self.db
            .query_with_params(
                "DELETE review_like WHERE review_id = $review_id AND user_id = $user_id",
                json!({
                    "review_id": review_id,
                    "user_id": user_id
                }),
            )
            .await?;

        self.recompute_like_count(&review.id).await
    }

    async fn like_exists(&self, review_id: &str, user_id: &str) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM review_like WHERE review_id = $review_id AND user_id = $user_id LIMIT 1",
                json!({
                    "review_id": review_id,
                    "user_id": user_id
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn decorate(
        &self,
        review: Review,
        viewer_id: Option<&str>,
    ) -> Result<ReviewWithAuthor> {
        let author = self
            .db
            .get_by_id::<UserProfile>("user_profile", &review.author_id)
            .await?;
        let (author_name, author_avatar) = match author {
            Some(profile) => (profile.name, profile.avatar_url),
            None => ("[deleted]".to_string(), None),
        };

        let you_liked = match viewer_id {
            Some(viewer) => self.like_exists(&review.id, viewer).await?,
            None => false,
        };

        Ok(ReviewWithAuthor {
            review,
            author_name,
            author_avatar,
            you_liked,
        })
    }

    // 点赞数按 review_like 表重新统计
    async fn recompute_like_count(&self, review_id: &str) -> Result<Review> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                LET $count = (SELECT count() FROM review_like WHERE review_id = $review_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('book_review', $review_id) SET like_count = $count, updated_at = time::now() RETURN AFTER;
                "#,
                json!({ "review_id": review_id }),
            )
            .await?;
        let updated: Vec<Review> = response.take(1)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Review not found"))
    }

    // 书评数按 book_review 表重新统计
    async fn recompute_reviews_count(&self, book_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                LET $count = (SELECT count() FROM book_review WHERE book_id = $book_id GROUP ALL)[0].count OR 0;
                UPDATE type::thing('book', $book_id) SET reviews_count = $count, updated_at = time::now();
                "#,
                json!({ "book_id": book_id }),
            )
            .await?;
        Ok(())
    }
}
