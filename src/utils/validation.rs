use crate::error::{AppError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// 验证邮箱并返回详细错误信息
/// 使用标准的RFC 5322邮箱格式验证
pub fn validate_email_format(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(AppError::Validation("邮箱不能为空".to_string()));
    }

    if !validator::validate_email(email) {
        return Err(AppError::Validation("邮箱格式不正确".to_string()));
    }

    // 检查邮箱长度
    if email.len() > 254 {
        return Err(AppError::Validation("邮箱地址过长".to_string()));
    }

    Ok(())
}

/// 验证密码强度
pub fn validate_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation("密码至少需要8个字符".to_string()));
    }

    if password.len() > 128 {
        return Err(AppError::Validation("密码不能超过128个字符".to_string()));
    }

    Ok(())
}

/// 验证手机号格式（宽松的国际格式）
pub fn validate_phone(phone: &str) -> Result<()> {
    static PHONE_PATTERN: OnceLock<Regex> = OnceLock::new();

    let pattern = PHONE_PATTERN.get_or_init(|| {
        Regex::new(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$").unwrap()
    });

    if !pattern.is_match(phone) {
        return Err(AppError::Validation("手机号格式不正确".to_string()));
    }

    Ok(())
}

/// 验证评分范围（0-5 分）
pub fn validate_rating(rating: f64) -> Result<()> {
    if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
        return Err(AppError::Validation("评分必须在0到5之间".to_string()));
    }

    Ok(())
}

/// 验证 OCR 页码范围
pub fn validate_page_range(start_page: u32, end_page: u32) -> Result<()> {
    if start_page < 1 {
        return Err(AppError::Validation("起始页码必须从1开始".to_string()));
    }

    if start_page > end_page {
        return Err(AppError::Validation("起始页码不能大于结束页码".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_format() {
        // 有效邮箱
        assert!(validate_email_format("user@example.com").is_ok());
        assert!(validate_email_format("test.email+tag@domain.co.uk").is_ok());

        // 无效邮箱
        assert!(validate_email_format("").is_err());
        assert!(validate_email_format("invalid-email").is_err());
        assert!(validate_email_format("@domain.com").is_err());
        assert!(validate_email_format(&"a".repeat(255)).is_err());
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("password123").is_ok());

        assert!(validate_password_strength("short").is_err());
        assert!(validate_password_strength(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        // 有效手机号
        assert!(validate_phone("+86 138 0013 8000").is_ok());
        assert!(validate_phone("13800138000").is_ok());
        assert!(validate_phone("+1-202-555-0136").is_ok());

        // 无效手机号
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("phone-number").is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(0.0).is_ok());
        assert!(validate_rating(3.5).is_ok());
        assert!(validate_rating(5.0).is_ok());

        assert!(validate_rating(-0.1).is_err());
        assert!(validate_rating(5.1).is_err());
        assert!(validate_rating(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_page_range() {
        assert!(validate_page_range(1, 1).is_ok());
        assert!(validate_page_range(2, 10).is_ok());

        assert!(validate_page_range(0, 5).is_err());
        assert!(validate_page_range(6, 5).is_err());
    }
}
