use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A registered user with their movie collections.
///
/// `hashed_password` never leaves the server; Google-only accounts have none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    pub auth_provider: String,
    #[serde(skip_serializing, default)]
    pub hashed_password: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub favorite_movies: Vec<i64>,
    pub watchlist: Vec<i64>,
    pub ratings: Vec<RatingEntry>,
}

/// One rating per movie per user, on a 1-10 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatingEntry {
    pub movie_id: i64,
    pub rating: i32,
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username or email address
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub new_password_confirm: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub new_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

impl TokenResponse {
    pub fn bearer(access_token: String, user: User) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
    pub message: String,
}

// ============================================================================
// Field validators
// ============================================================================

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());
static UPPERCASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{9,15}$").unwrap());

pub fn validate_username(value: &str) -> AppResult<()> {
    if !USERNAME_RE.is_match(value) {
        return Err(AppError::validation(
            "username",
            "Username must be alphanumeric and can include underscores",
        ));
    }
    if !(3..=20).contains(&value.len()) {
        return Err(AppError::validation(
            "username",
            "Username must be between 3 and 20 characters",
        ));
    }
    Ok(())
}

pub fn validate_password(field: &str, value: &str) -> AppResult<()> {
    if value.len() < 8 {
        return Err(AppError::validation(
            field,
            "Password must be at least 8 characters long",
        ));
    }
    if value.len() > 100 {
        return Err(AppError::validation(
            field,
            "Password must not exceed 100 characters",
        ));
    }
    if !UPPERCASE_RE.is_match(value) {
        return Err(AppError::validation(
            field,
            "Password must contain at least one uppercase letter",
        ));
    }
    Ok(())
}

pub fn validate_name(field: &str, value: &str) -> AppResult<()> {
    if !(2..=30).contains(&value.chars().count()) {
        return Err(AppError::validation(
            field,
            "Name must be between 2 and 30 characters",
        ));
    }
    Ok(())
}

pub fn validate_phone_number(value: &str) -> AppResult<()> {
    if !PHONE_RE.is_match(value) {
        return Err(AppError::validation(
            "phone_number",
            "Phone number must be in international format (e.g. +1234567890)",
        ));
    }
    Ok(())
}

/// Loose shape check; real validation happens when the verification email bounces
pub fn validate_email(field: &str, value: &str) -> AppResult<()> {
    let valid = value.contains('@')
        && !value.starts_with('@')
        && !value.ends_with('@')
        && !value.contains(char::is_whitespace);
    if !valid {
        return Err(AppError::validation(field, "Invalid email address"));
    }
    Ok(())
}

impl SignupRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_username(&self.username)?;
        validate_password("password", &self.password)?;
        validate_email("email", &self.email)?;
        validate_name("first_name", &self.first_name)?;
        validate_name("last_name", &self.last_name)?;
        validate_phone_number(&self.phone_number)?;
        Ok(())
    }
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(new_password) = &self.new_password {
            validate_password("new_password", new_password)?;
        }
        if let Some(first_name) = &self.first_name {
            validate_name("first_name", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            validate_name("last_name", last_name)?;
        }
        if let Some(phone_number) = &self.phone_number {
            validate_phone_number(phone_number)?;
        }
        if let Some(new_email) = &self.new_email {
            validate_email("new_email", new_email)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_accepts_underscores() {
        assert!(validate_username("movie_fan_42").is_ok());
    }

    #[test]
    fn test_validate_username_rejects_symbols() {
        assert!(validate_username("movie-fan!").is_err());
    }

    #[test]
    fn test_validate_username_rejects_too_short() {
        assert!(validate_username("ab").is_err());
    }

    #[test]
    fn test_validate_password_requires_uppercase() {
        assert!(validate_password("password", "lowercase1234").is_err());
        assert!(validate_password("password", "Lowercase1234").is_ok());
    }

    #[test]
    fn test_validate_password_length_bounds() {
        assert!(validate_password("password", "Short1").is_err());
        let long = format!("A{}", "a".repeat(100));
        assert!(validate_password("password", &long).is_err());
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+1234567890").is_ok());
        assert!(validate_phone_number("123456789").is_ok());
        assert!(validate_phone_number("not-a-phone").is_err());
        assert!(validate_phone_number("+12").is_err());
    }

    #[test]
    fn test_validate_email_shape() {
        assert!(validate_email("email", "user@example.com").is_ok());
        assert!(validate_email("email", "no-at-sign").is_err());
        assert!(validate_email("email", "@leading.com").is_err());
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: "u-1".to_string(),
            username: "movie_fan".to_string(),
            email: "fan@example.com".to_string(),
            first_name: None,
            last_name: None,
            phone_number: None,
            google_id: None,
            auth_provider: "local".to_string(),
            hashed_password: Some("$2b$12$secret".to_string()),
            is_verified: true,
            created_at: Utc::now(),
            favorite_movies: vec![27205],
            watchlist: vec![],
            ratings: vec![RatingEntry {
                movie_id: 27205,
                rating: 9,
            }],
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("secret"));
        assert!(json.contains("favorite_movies"));
    }

    #[test]
    fn test_signup_request_validates_all_fields() {
        let request = SignupRequest {
            username: "movie_fan".to_string(),
            password: "Password123".to_string(),
            confirm_password: "Password123".to_string(),
            email: "fan@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone_number: "+1234567890".to_string(),
        };
        assert!(request.validate().is_ok());

        let bad_phone = SignupRequest {
            phone_number: "abc".to_string(),
            ..request
        };
        assert!(bad_phone.validate().is_err());
    }
}
