use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub price: f64,
    pub description: Option<String>,
    /// 所有评分之和与评分人数，rate 由两者推导
    pub rating_sum: f64,
    pub rating_count: i64,
    pub rate: f64,
    pub readers_count: i64,
    pub reading_count: i64,
    pub to_read_count: i64,
    pub reviews_count: i64,
    pub cover_path: Option<String>,
    pub pdf_path: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 用户对图书的评分记录，每人每本限一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRating {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

impl BookRating {
    pub fn new(user_id: &str, book_id: &str, rating: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            book_id: book_id.to_string(),
            rating,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateBookRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(min = 1, max = 200))]
    pub author: String,

    #[validate(length(min = 1, max = 100))]
    pub genre: String,

    #[validate(length(max = 200))]
    pub publisher: Option<String>,

    pub publication_date: Option<NaiveDate>,

    #[validate(range(min = 0.0))]
    pub price: f64,

    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub author: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub genre: Option<String>,

    #[validate(length(max = 200))]
    pub publisher: Option<String>,

    pub publication_date: Option<NaiveDate>,

    #[validate(range(min = 0.0))]
    pub price: Option<f64>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub price: f64,
    pub description: Option<String>,
    pub rate: f64,
    pub rating_count: i64,
    pub readers_count: i64,
    pub reading_count: i64,
    pub to_read_count: i64,
    pub reviews_count: i64,
    pub cover_url: Option<String>,
    pub has_pdf: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn new(created_by: &str, request: CreateBookRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: request.title,
            author: request.author,
            genre: request.genre,
            publisher: request.publisher,
            publication_date: request.publication_date,
            price: request.price,
            description: request.description,
            rating_sum: 0.0,
            rating_count: 0,
            rate: 0.0,
            readers_count: 0,
            reading_count: 0,
            to_read_count: 0,
            reviews_count: 0,
            cover_path: None,
            pdf_path: None,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 平均分保留一位小数，未评分时为 0
    pub fn compute_rate(rating_sum: f64, rating_count: i64) -> f64 {
        if rating_count <= 0 {
            return 0.0;
        }
        (rating_sum / rating_count as f64 * 10.0).round() / 10.0
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }

    pub fn to_response(&self) -> BookResponse {
        BookResponse {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            genre: self.genre.clone(),
            publisher: self.publisher.clone(),
            publication_date: self.publication_date,
            price: self.price,
            description: self.description.clone(),
            rate: self.rate,
            rating_count: self.rating_count,
            readers_count: self.readers_count,
            reading_count: self.reading_count,
            to_read_count: self.to_read_count,
            reviews_count: self.reviews_count,
            cover_url: self
                .cover_path
                .as_ref()
                .map(|_| format!("/api/books/{}/cover", self.id)),
            has_pdf: self.pdf_path.is_some(),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_rate_is_running_mean() {
        // 依次评分 4, 5, 3，平均 4.0
        let ratings = [4.0, 5.0, 3.0];
        let mut sum = 0.0;
        let mut count = 0;
        for r in ratings {
            sum += r;
            count += 1;
        }
        assert_eq!(Book::compute_rate(sum, count), 4.0);
    }

    #[test]
    fn test_compute_rate_rounds_to_one_decimal() {
        // (5 + 4 + 4) / 3 = 4.333... -> 4.3
        assert_eq!(Book::compute_rate(13.0, 3), 4.3);
        // (5 + 4) / 2 = 4.5
        assert_eq!(Book::compute_rate(9.0, 2), 4.5);
    }

    #[test]
    fn test_compute_rate_unrated() {
        assert_eq!(Book::compute_rate(0.0, 0), 0.0);
    }

    #[test]
    fn test_create_book_request_validation() {
        let request = CreateBookRequest {
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            genre: "Programming".to_string(),
            publisher: None,
            publication_date: None,
            price: 0.0,
            description: None,
        };
        assert!(validator::Validate::validate(&request).is_ok());

        let negative_price = CreateBookRequest {
            price: -1.0,
            ..request
        };
        assert!(validator::Validate::validate(&negative_price).is_err());
    }

    #[test]
    fn test_response_exposes_cover_url_only_when_present() {
        let request = CreateBookRequest {
            title: "T".to_string(),
            author: "A".to_string(),
            genre: "G".to_string(),
            publisher: None,
            publication_date: None,
            price: 1.0,
            description: None,
        };
        let mut book = Book::new("user-1", request);
        assert!(book.to_response().cover_url.is_none());

        book.cover_path = Some("covers/abc.png".to_string());
        let response = book.to_response();
        assert_eq!(
            response.cover_url.as_deref(),
            Some(format!("/api/books/{}/cover", book.id).as_str())
        );
    }

    #[test]
    fn test_is_owned_by_creator_only() {
        let request = CreateBookRequest {
            title: "T".to_string(),
            author: "A".to_string(),
            genre: "G".to_string(),
            publisher: None,
            publication_date: None,
            price: 1.0,
            description: None,
        };
        let book = Book::new("user-1", request);
        assert!(book.is_owned_by("user-1"));
        assert!(!book.is_owned_by("user-2"));
    }
}
