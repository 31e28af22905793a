use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::utils::serde_helpers::thing_id;

/// 用户身份类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    Reader,
    Author,
    Publisher,
}

impl Default for Identity {
    fn default() -> Self {
        Identity::Reader
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

/// 出版商的联系地址
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, max = 200))]
    pub location: String,

    #[validate(length(min = 1, max = 100))]
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "thing_id::deserialize", default)]
    pub id: String,
    pub identity: Identity,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub follower_count: i64,
    pub following_count: i64,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    pub identity: Option<Identity>,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(max = 500))]
    pub bio: Option<String>,

    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate]
    pub address: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub identity: Option<Identity>,

    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,

    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate]
    pub address: Option<Address>,
}

/// 对外返回的用户信息（不含密码散列）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileResponse {
    pub id: String,
    pub identity: Identity,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub follower_count: i64,
    pub following_count: i64,
    pub date_joined: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(identity: Identity, name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            identity,
            name,
            email,
            password_hash,
            bio: None,
            avatar_url: None,
            birth_date: None,
            gender: None,
            phone: None,
            address: None,
            follower_count: 0,
            following_count: 0,
            date_joined: now,
            updated_at: now,
        }
    }

    pub fn to_response(&self) -> UserProfileResponse {
        UserProfileResponse {
            id: self.id.clone(),
            identity: self.identity,
            name: self.name.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
            avatar_url: self.avatar_url.clone(),
            birth_date: self.birth_date,
            gender: self.gender,
            phone: self.phone.clone(),
            address: self.address.clone(),
            follower_count: self.follower_count,
            following_count: self.following_count,
            date_joined: self.date_joined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let request = RegisterRequest {
            identity: Some(Identity::Reader),
            name: "Test Reader".to_string(),
            email: "reader@example.com".to_string(),
            password: "password123".to_string(),
            bio: None,
            birth_date: None,
            gender: None,
            phone: None,
            address: None,
        };
        assert!(validator::Validate::validate(&request).is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..request
        };
        assert!(validator::Validate::validate(&bad_email).is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        let request = RegisterRequest {
            identity: None,
            name: "Test".to_string(),
            email: "user@example.com".to_string(),
            password: "short".to_string(),
            bio: None,
            birth_date: None,
            gender: None,
            phone: None,
            address: None,
        };
        assert!(validator::Validate::validate(&request).is_err());
    }

    #[test]
    fn test_identity_serialization() {
        assert_eq!(
            serde_json::to_string(&Identity::Publisher).unwrap(),
            "\"publisher\""
        );
        let parsed: Identity = serde_json::from_str("\"author\"").unwrap();
        assert_eq!(parsed, Identity::Author);
    }

    #[test]
    fn test_response_hides_password_hash() {
        let profile = UserProfile::new(
            Identity::Reader,
            "Test".to_string(),
            "user@example.com".to_string(),
            "argon2-hash".to_string(),
        );
        let serialized = serde_json::to_value(profile.to_response()).unwrap();
        assert!(serialized.get("password_hash").is_none());
        assert_eq!(serialized["email"], "user@example.com");
    }
}
