use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::Config,
    db::UserStore,
    error::{AppError, AppResult},
    models::{ResetPasswordRequest, TokenResponse, User, UserEnvelope},
    services::{
        account::validate_password_confirmation,
        email::Mailer,
        security::{
            create_access_token, hash_password, verify_email_token, verify_password,
            verify_user_token,
        },
    },
};

/// Profile fields Google returns from the userinfo endpoint
#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
}

/// Looks a user up by username or email address
async fn find_by_identifier(store: &UserStore, identifier: &str) -> AppResult<Option<User>> {
    if identifier.contains('@') {
        store.find_by_email(identifier).await
    } else {
        store.find_by_username(identifier).await
    }
}

/// Local username/password login
pub async fn authenticate_user(
    store: &UserStore,
    config: &Config,
    identifier: &str,
    password: &str,
) -> AppResult<TokenResponse> {
    let bad_credentials = || AppError::unauthorized("username", "Incorrect username or password");

    let user = find_by_identifier(store, identifier)
        .await?
        .ok_or_else(bad_credentials)?;

    // Google-only accounts have no password hash to check against
    let hash = user.hashed_password.as_deref().ok_or_else(bad_credentials)?;

    if !verify_password(password, hash) {
        return Err(bad_credentials());
    }

    if !user.is_verified {
        return Err(AppError::forbidden(
            "verification",
            "Please verify your email before logging in.",
        ));
    }

    let access_token = create_access_token(
        &config.secret_key,
        &user.id,
        None,
        Duration::minutes(config.access_token_expire_minutes),
    )?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(TokenResponse::bearer(access_token, user))
}

/// Builds the Google authorization redirect URL
pub fn google_login_url(config: &Config) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope=openid%20email%20profile&access_type=offline",
        config.google_authorization_endpoint, config.google_client_id, config.google_redirect_uri
    )
}

/// Completes the Google OAuth code exchange and issues an access token
pub async fn authenticate_google_user(
    store: &UserStore,
    config: &Config,
    code: &str,
) -> AppResult<TokenResponse> {
    let info = fetch_google_user(config, code).await?;
    let user = create_or_update_google_user(store, info).await?;

    let access_token = create_access_token(
        &config.secret_key,
        &user.id,
        None,
        Duration::minutes(config.access_token_expire_minutes),
    )?;

    tracing::info!(user_id = %user.id, "User logged in via Google");

    Ok(TokenResponse::bearer(access_token, user))
}

/// Exchanges the authorization code for an access token, then fetches the
/// user's profile from the userinfo endpoint
async fn fetch_google_user(config: &Config, code: &str) -> AppResult<GoogleUserInfo> {
    let client = reqwest::Client::new();

    let token_response: serde_json::Value = client
        .post(&config.google_token_endpoint)
        .form(&[
            ("code", code),
            ("client_id", &config.google_client_id),
            ("client_secret", &config.google_client_secret),
            ("redirect_uri", &config.google_redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?
        .json()
        .await?;

    if token_response.get("error").is_some() {
        return Err(AppError::validation(
            "token",
            "Error retrieving access token",
        ));
    }

    let access_token = token_response
        .get("access_token")
        .and_then(|t| t.as_str())
        .ok_or_else(|| AppError::validation("token", "Error retrieving access token"))?;

    let info: GoogleUserInfo = client
        .get(&config.google_userinfo_endpoint)
        .bearer_auth(access_token)
        .send()
        .await?
        .json()
        .await?;

    Ok(info)
}

/// Creates a Google-backed account, or links the Google identity to an
/// existing local account with the same email
pub async fn create_or_update_google_user(
    store: &UserStore,
    info: GoogleUserInfo,
) -> AppResult<User> {
    if let Some(user) = store.find_by_email(&info.email).await? {
        if user.google_id.is_none() {
            return store
                .link_google_identity(
                    &user.id,
                    &info.sub,
                    info.given_name.as_deref(),
                    info.family_name.as_deref(),
                )
                .await;
        }
        return Ok(user);
    }

    let username = info
        .email
        .split('@')
        .next()
        .unwrap_or(info.email.as_str())
        .to_string();

    let user = User {
        id: Uuid::new_v4().to_string(),
        username,
        email: info.email,
        first_name: info.given_name,
        last_name: info.family_name,
        phone_number: None,
        google_id: Some(info.sub),
        auth_provider: "google".to_string(),
        hashed_password: None,
        // Google already verified the address
        is_verified: true,
        created_at: Utc::now(),
        favorite_movies: Vec::new(),
        watchlist: Vec::new(),
        ratings: Vec::new(),
    };

    store.insert(&user).await?;

    Ok(user)
}

/// Applies an email-verification token: marks the user verified and writes
/// the address the token carries
pub async fn verify_email(store: &UserStore, config: &Config, token: &str) -> AppResult<User> {
    let (user_id, new_email) = verify_email_token(&config.secret_key, token)?;

    if store.find_by_id(&user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    store.set_verified_email(&user_id, &new_email).await
}

pub async fn resend_verification_email(
    store: &UserStore,
    mailer: &Mailer,
    email: &str,
) -> AppResult<UserEnvelope> {
    let user = store
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.is_verified {
        return Err(AppError::validation("email", "Email already verified"));
    }

    mailer.dispatch_verification_email(&user.id, &user.email)?;

    Ok(UserEnvelope {
        user,
        message: "Verification email has been resent.".to_string(),
    })
}

pub async fn forgot_password(
    store: &UserStore,
    mailer: &Mailer,
    email: &str,
) -> AppResult<UserEnvelope> {
    let user = store
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    mailer.dispatch_password_reset_email(&user.id, &user.email)?;

    Ok(UserEnvelope {
        user,
        message: "Password reset email has been sent".to_string(),
    })
}

/// Applies a password-reset token and stores the new password hash
pub async fn reset_password(
    store: &UserStore,
    config: &Config,
    request: ResetPasswordRequest,
) -> AppResult<UserEnvelope> {
    let user_id = verify_user_token(&config.secret_key, &request.token)?;

    let user = store
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    validate_password_confirmation(
        Some(&request.new_password),
        Some(&request.new_password_confirm),
    )?;
    crate::models::user::validate_password("new_password", &request.new_password)?;

    let updates = crate::db::ProfileUpdates {
        hashed_password: Some(hash_password(&request.new_password)?),
        ..Default::default()
    };
    let user = store.apply_profile_updates(&user.id, updates).await?;

    Ok(UserEnvelope {
        user,
        message: "Password has been reset successfully".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            tmdb_api_key: String::new(),
            tmdb_base_url: String::new(),
            secret_key: "secret".to_string(),
            access_token_expire_minutes: 30,
            email_token_expire_hours: 24,
            google_client_id: "client-id".to_string(),
            google_client_secret: "client-secret".to_string(),
            google_redirect_uri: "https://api.moviecompass.io/auth/google/callback".to_string(),
            google_authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth"
                .to_string(),
            google_token_endpoint: String::new(),
            google_userinfo_endpoint: String::new(),
            smtp_server: String::new(),
            smtp_port: 587,
            email_username: String::new(),
            email_password: String::new(),
            email_from: String::new(),
            model_id: String::new(),
            llm_endpoint: String::new(),
            deployment_url: String::new(),
            frontend_url: String::new(),
            host: String::new(),
            port: 3000,
        }
    }

    #[test]
    fn test_google_login_url_contains_oauth_params() {
        let url = google_login_url(&test_config());
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?response_type=code"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("access_type=offline"));
    }

    #[test]
    fn test_google_userinfo_deserializes_minimal_payload() {
        let json = r#"{"sub": "google-123", "email": "fan@example.com"}"#;
        let info: GoogleUserInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.sub, "google-123");
        assert_eq!(info.given_name, None);
    }
}
