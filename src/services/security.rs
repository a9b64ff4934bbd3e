use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// JWT claims for access and email-verification tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Present only on email-verification tokens
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_email: Option<String>,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(plain_password: &str, hashed_password: &str) -> bool {
    bcrypt::verify(plain_password, hashed_password).unwrap_or(false)
}

/// Creates a signed access token for the given user id
pub fn create_access_token(
    secret: &str,
    user_id: &str,
    new_email: Option<&str>,
    expires_in: Duration,
) -> AppResult<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + expires_in).timestamp(),
        new_email: new_email.map(str::to_string),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token creation failed: {}", e)))
}

/// Verifies a token and returns the user id it was issued for
pub fn verify_user_token(secret: &str, token: &str) -> AppResult<String> {
    let claims = decode_claims(secret, token)?;

    if claims.sub.is_empty() {
        return Err(AppError::validation("token", "Invalid token payload"));
    }

    Ok(claims.sub)
}

/// Verifies an email-verification token, returning (user id, new email)
pub fn verify_email_token(secret: &str, token: &str) -> AppResult<(String, String)> {
    let claims = decode_claims(secret, token)?;

    match claims.new_email {
        Some(new_email) if !claims.sub.is_empty() => Ok((claims.sub, new_email)),
        _ => Err(AppError::validation("token", "Invalid token payload")),
    }
}

fn decode_claims(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::validation("token", "Invalid or expired token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("Password123").unwrap();
        assert!(verify_password("Password123", &hash));
        assert!(!verify_password("WrongPassword1", &hash));
    }

    #[test]
    fn test_verify_password_garbage_hash_is_false() {
        assert!(!verify_password("Password123", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_access_token_roundtrip() {
        let token = create_access_token(SECRET, "user-1", None, Duration::minutes(30)).unwrap();
        let user_id = verify_user_token(SECRET, &token).unwrap();
        assert_eq!(user_id, "user-1");
    }

    #[test]
    fn test_email_token_roundtrip() {
        let token = create_access_token(
            SECRET,
            "user-1",
            Some("new@example.com"),
            Duration::hours(24),
        )
        .unwrap();
        let (user_id, new_email) = verify_email_token(SECRET, &token).unwrap();
        assert_eq!(user_id, "user-1");
        assert_eq!(new_email, "new@example.com");
    }

    #[test]
    fn test_access_token_is_not_an_email_token() {
        let token = create_access_token(SECRET, "user-1", None, Duration::minutes(30)).unwrap();
        assert!(verify_email_token(SECRET, &token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token =
            create_access_token(SECRET, "user-1", None, Duration::minutes(-5)).unwrap();
        assert!(verify_user_token(SECRET, &token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token(SECRET, "user-1", None, Duration::minutes(30)).unwrap();
        assert!(verify_user_token("other-secret", &token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = create_access_token(SECRET, "user-1", None, Duration::minutes(30)).unwrap();
        let tampered = format!("{}x", token);
        assert!(verify_user_token(SECRET, &tampered).is_err());
    }
}
