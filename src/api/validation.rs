//! Input validation for API requests.
//!
//! Validators return `Err(message)` and are collected per field with the
//! `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ApiError, ValidationErrorBuilder};
use crate::catalog::slugify;
use crate::db::{CategoryRequest, CreateReviewRequest, CreateUserRequest, ProductRequest, UpdateReviewRequest};

/// Longest accepted display name (users, categories, products)
pub const MAX_NAME_LEN: usize = 128;
/// Longest accepted review comment
pub const MAX_COMMENT_LEN: usize = 500;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_GRADE: f64 = 1.0;
pub const MAX_GRADE: f64 = 10.0;

lazy_static! {
    /// Loose email shape check: something@something.tld
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    /// Usernames: letters, digits, dot, dash and underscore
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

/// Validate a required display name
pub fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name is too long (max {} characters)", MAX_NAME_LEN));
    }
    Ok(())
}

/// Validate a name that has to produce a usable slug
pub fn validate_sluggable_name(name: &str) -> Result<(), String> {
    validate_name(name)?;
    if slugify(name).is_empty() {
        return Err("Name must contain at least one letter or digit".to_string());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if username.len() > MAX_NAME_LEN {
        return Err(format!("Username is too long (max {} characters)", MAX_NAME_LEN));
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err("Username may only contain letters, digits, '.', '-' and '_'".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

/// Validate a non-negative integer quantity (price, stock)
pub fn validate_non_negative(value: i64, what: &str) -> Result<(), String> {
    if value < 0 {
        return Err(format!("{} must not be negative", what));
    }
    Ok(())
}

pub fn validate_grade(grade: f64) -> Result<(), String> {
    if !grade.is_finite() || !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
        return Err(format!(
            "Grade must be between {} and {}",
            MIN_GRADE, MAX_GRADE
        ));
    }
    Ok(())
}

pub fn validate_comment(comment: Option<&str>) -> Result<(), String> {
    match comment {
        Some(c) if c.chars().count() > MAX_COMMENT_LEN => Err(format!(
            "Comment is too long (max {} characters)",
            MAX_COMMENT_LEN
        )),
        _ => Ok(()),
    }
}

pub fn validate_create_user(req: &CreateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("first_name", validate_name(&req.first_name))
        .check("last_name", validate_name(&req.last_name))
        .check("username", validate_username(&req.username))
        .check("email", validate_email(&req.email))
        .check("password", validate_password(&req.password));
    errors.finish()
}

pub fn validate_category(req: &CategoryRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_sluggable_name(&req.name));
    errors.finish()
}

pub fn validate_product(req: &ProductRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_sluggable_name(&req.name))
        .check("price", validate_non_negative(req.price, "Price"))
        .check("stock", validate_non_negative(req.stock, "Stock"));
    errors.finish()
}

pub fn validate_create_review(req: &CreateReviewRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("grade", validate_grade(req.grade))
        .check("comment", validate_comment(req.comment.as_deref()));
    errors.finish()
}

pub fn validate_update_review(req: &UpdateReviewRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(grade) = req.grade {
        errors.check("grade", validate_grade(grade));
    }
    errors.check("comment", validate_comment(req.comment.as_deref()));
    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Phones").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_sluggable_name() {
        assert!(validate_sluggable_name("Garden & Tools").is_ok());
        assert!(validate_sluggable_name("???").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("john.doe_42").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("john doe").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("user.example.com").is_err());
        assert!(validate_email("user@localhost").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_grade() {
        assert!(validate_grade(1.0).is_ok());
        assert!(validate_grade(10.0).is_ok());
        assert!(validate_grade(7.5).is_ok());
        assert!(validate_grade(0.5).is_err());
        assert!(validate_grade(10.5).is_err());
        assert!(validate_grade(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_comment() {
        assert!(validate_comment(None).is_ok());
        assert!(validate_comment(Some("Great tea")).is_ok());
        assert!(validate_comment(Some(&"a".repeat(MAX_COMMENT_LEN))).is_ok());
        assert!(validate_comment(Some(&"a".repeat(MAX_COMMENT_LEN + 1))).is_err());
    }

    #[test]
    fn test_validate_product_collects_fields() {
        let req = ProductRequest {
            name: String::new(),
            description: String::new(),
            price: -1,
            image_url: String::new(),
            stock: -5,
            category: 1,
        };
        let err = validate_product(&req).unwrap_err();
        assert!(err.message().contains("3 fields"));
    }
}
