use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::{LoginRequest, RegisterRequest, UserProfile},
    services::Database,
    utils::validation,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct AuthService {
    config: Config,
    db: Arc<Database>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    pub exp: i64,    // 过期时间
    pub iat: i64,    // 签发时间
}

/// 使用 Argon2 生成密码散列
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// 校验密码与散列是否匹配
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 签发 HS256 JWT，载荷为 sub/exp/iat
pub fn encode_token(secret: &str, user_id: &str, expiry_minutes: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + Duration::minutes(expiry_minutes)).timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

/// 解析并校验 JWT（含过期检查）
pub fn decode_token(secret: &str, token: &str) -> Result<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_ref());
    let validation = Validation::new(Algorithm::HS256);

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(token_data) => Ok(token_data.claims),
        Err(e) => {
            warn!("JWT verification failed: {}", e);
            Err(AppError::Authentication("Invalid token".to_string()))
        }
    }
}

impl AuthService {
    pub async fn new(config: &Config, db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            db,
        })
    }

    /// 注册新用户，邮箱全局唯一
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile> {
        debug!("Registering new user: {}", request.email);

        request.validate().map_err(AppError::ValidatorError)?;
        validation::validate_email_format(&request.email)?;
        validation::validate_password_strength(&request.password)?;
        if let Some(phone) = &request.phone {
            validation::validate_phone(phone)?;
        }

        let existing: Option<UserProfile> = self
            .db
            .find_one("user_profile", "email", &request.email)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)?;

        let mut profile = UserProfile::new(
            request.identity.unwrap_or_default(),
            request.name,
            request.email,
            password_hash,
        );
        profile.bio = request.bio;
        profile.birth_date = request.birth_date;
        profile.gender = request.gender;
        profile.phone = request.phone;
        profile.address = request.address;

        let created: UserProfile = self.db.create("user_profile", profile).await?;
        info!("User registered: {} ({})", created.name, created.id);

        Ok(created)
    }

    /// 校验凭据并签发令牌
    pub async fn login(&self, request: LoginRequest) -> Result<(UserProfile, String)> {
        request.validate().map_err(AppError::ValidatorError)?;

        let profile: UserProfile = self
            .db
            .find_one("user_profile", "email", &request.email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&request.password, &profile.password_hash)? {
            warn!("Failed login attempt for {}", request.email);
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.issue_token(&profile.id)?;
        info!("User logged in: {}", profile.id);

        Ok((profile, token))
    }

    pub fn issue_token(&self, user_id: &str) -> Result<String> {
        encode_token(
            &self.config.jwt_secret,
            user_id,
            self.config.jwt_expiry_minutes,
        )
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let claims = decode_token(&self.config.jwt_secret, token)?;
        debug!("JWT token verified for user: {}", claims.sub);
        Ok(claims)
    }

    /// 通过令牌加载当前用户资料
    pub async fn authenticate(&self, token: &str) -> Result<UserProfile> {
        let claims = self.verify_jwt(token)?;

        let profile: Option<UserProfile> =
            self.db.get_by_id("user_profile", &claims.sub).await?;
        profile.ok_or_else(|| AppError::Authentication("User no longer exists".to_string()))
    }

    /// Cookie 过期秒数，供登录响应设置 HttpOnly cookie
    pub fn cookie_max_age_seconds(&self) -> i64 {
        self.config.jwt_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert_ne!(hash, "correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_token_round_trip() {
        let token = encode_token("test-secret", "user-42", 60).unwrap();
        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, "user-42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = encode_token("test-secret", "user-42", 60).unwrap();
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // 过期时间在 jsonwebtoken 默认 60 秒容差之外
        let token = encode_token("test-secret", "user-42", -10).unwrap();
        assert!(decode_token("test-secret", &token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode_token("test-secret", "not.a.token").is_err());
    }
}
