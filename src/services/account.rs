use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{ProfileUpdates, UserStore},
    error::{AppError, AppResult},
    models::{RatingEntry, SignupRequest, UpdateProfileRequest, User, UserEnvelope},
    services::{
        email::Mailer,
        security::{hash_password, verify_password},
        tmdb::TmdbClient,
    },
};

/// Registers a local account and dispatches the verification email
pub async fn signup(store: &UserStore, mailer: &Mailer, request: SignupRequest) -> AppResult<User> {
    request.validate()?;

    if request.password != request.confirm_password {
        return Err(AppError::validation(
            "confirm_password",
            "Password and confirm password do not match",
        ));
    }

    if store.find_by_username(&request.username).await?.is_some() {
        return Err(AppError::validation("username", "Username already taken"));
    }
    if store.find_by_email(&request.email).await?.is_some() {
        return Err(AppError::validation("email", "Email already registered"));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: request.username,
        email: request.email,
        first_name: Some(request.first_name),
        last_name: Some(request.last_name),
        phone_number: Some(request.phone_number),
        google_id: None,
        auth_provider: "local".to_string(),
        hashed_password: Some(hash_password(&request.password)?),
        is_verified: false,
        created_at: Utc::now(),
        favorite_movies: Vec::new(),
        watchlist: Vec::new(),
        ratings: Vec::new(),
    };

    store.insert(&user).await?;

    tracing::info!(user_id = %user.id, "User registered");

    mailer.dispatch_verification_email(&user.id, &user.email)?;

    Ok(user)
}

pub fn validate_password_confirmation(
    new_password: Option<&str>,
    confirmation: Option<&str>,
) -> AppResult<()> {
    match (new_password, confirmation) {
        (None, _) => Err(AppError::validation(
            "password",
            "Must provide new password and confirm it.",
        )),
        (Some(_), None) => Err(AppError::validation(
            "new_password_confirm",
            "Confirm password is required",
        )),
        (Some(new), Some(confirm)) if new != confirm => Err(AppError::validation(
            "new_password_confirm",
            "New password and confirmation do not match",
        )),
        _ => Ok(()),
    }
}

/// Applies a partial profile update.
///
/// Username, password, and plain profile fields are written directly; an
/// email change only triggers a fresh verification email — the address is
/// not applied until the token comes back.
pub async fn update_profile(
    store: &UserStore,
    mailer: &Mailer,
    current_user: &User,
    updates: UpdateProfileRequest,
) -> AppResult<UserEnvelope> {
    updates.validate()?;

    let mut db_updates = ProfileUpdates {
        first_name: updates.first_name,
        last_name: updates.last_name,
        phone_number: updates.phone_number,
        ..Default::default()
    };

    if let Some(username) = updates.username {
        if let Some(existing) = store.find_by_username(&username).await? {
            if existing.id != current_user.id {
                return Err(AppError::validation("username", "Username already taken"));
            }
        }
        db_updates.username = Some(username);
    }

    let wants_password_change = updates.old_password.is_some()
        || updates.new_password.is_some()
        || updates.new_password_confirm.is_some();
    if wants_password_change {
        validate_password_confirmation(
            updates.new_password.as_deref(),
            updates.new_password_confirm.as_deref(),
        )?;
        let new_password = updates.new_password.as_deref().ok_or_else(|| {
            AppError::validation("password", "Must provide new password and confirm it.")
        })?;

        if let Some(current_hash) = &current_user.hashed_password {
            let old_password = updates.old_password.as_deref().ok_or_else(|| {
                AppError::validation(
                    "password",
                    "Must provide old password to change an existing password.",
                )
            })?;

            if !verify_password(old_password, current_hash) {
                return Err(AppError::validation("password", "Old password is incorrect"));
            }
        }

        db_updates.hashed_password = Some(hash_password(new_password)?);
    }

    let mut email_message = None;
    if let Some(new_email) = updates.new_email {
        if let Some(existing) = store.find_by_email(&new_email).await? {
            if existing.id != current_user.id {
                return Err(AppError::validation("email", "Email already in use"));
            }
        }

        mailer.dispatch_verification_email(&current_user.id, &new_email)?;
        email_message = Some("Verification email has been resent.");
    }

    if db_updates.is_empty() {
        let message = email_message.unwrap_or("No changes").to_string();
        return Ok(UserEnvelope {
            user: current_user.clone(),
            message,
        });
    }

    let user = store
        .apply_profile_updates(&current_user.id, db_updates)
        .await?;

    let message = match email_message {
        Some(resent) => format!("Profile updated. {}", resent),
        None => "Profile updated".to_string(),
    };

    Ok(UserEnvelope { user, message })
}

// ----------------------------------------------------------------------
// Favorites, watchlist, ratings
// ----------------------------------------------------------------------

pub async fn add_favorite(
    store: &UserStore,
    tmdb: &TmdbClient,
    user: &User,
    movie_id: i64,
) -> AppResult<Vec<i64>> {
    if user.favorite_movies.contains(&movie_id) {
        return Err(AppError::validation(
            "movie_id",
            "Movie already in favorites",
        ));
    }

    ensure_movie_exists(tmdb, movie_id).await?;

    store.add_favorite(&user.id, movie_id).await
}

pub async fn remove_favorite(store: &UserStore, user: &User, movie_id: i64) -> AppResult<Vec<i64>> {
    if !user.favorite_movies.contains(&movie_id) {
        return Err(AppError::NotFound(
            "Movie not found in favorites".to_string(),
        ));
    }

    store.remove_favorite(&user.id, movie_id).await
}

pub async fn add_to_watchlist(
    store: &UserStore,
    tmdb: &TmdbClient,
    user: &User,
    movie_id: i64,
) -> AppResult<Vec<i64>> {
    if user.watchlist.contains(&movie_id) {
        return Err(AppError::validation(
            "movie_id",
            "Movie already in watchlist",
        ));
    }

    ensure_movie_exists(tmdb, movie_id).await?;

    store.add_to_watchlist(&user.id, movie_id).await
}

pub async fn remove_from_watchlist(
    store: &UserStore,
    user: &User,
    movie_id: i64,
) -> AppResult<Vec<i64>> {
    if !user.watchlist.contains(&movie_id) {
        return Err(AppError::NotFound(
            "Movie not found in watchlist".to_string(),
        ));
    }

    store.remove_from_watchlist(&user.id, movie_id).await
}

pub async fn rate_movie(
    store: &UserStore,
    tmdb: &TmdbClient,
    user: &User,
    movie_id: i64,
    rating: i32,
) -> AppResult<Vec<RatingEntry>> {
    if !(1..=10).contains(&rating) {
        return Err(AppError::validation(
            "rating",
            "Rating should be between 1 and 10",
        ));
    }

    ensure_movie_exists(tmdb, movie_id).await?;

    store.upsert_rating(&user.id, movie_id, rating).await
}

pub async fn delete_rating(
    store: &UserStore,
    user: &User,
    movie_id: i64,
) -> AppResult<Vec<RatingEntry>> {
    if !user.ratings.iter().any(|r| r.movie_id == movie_id) {
        return Err(AppError::NotFound(
            "Rating not found for this movie".to_string(),
        ));
    }

    store.delete_rating(&user.id, movie_id).await
}

async fn ensure_movie_exists(tmdb: &TmdbClient, movie_id: i64) -> AppResult<()> {
    tmdb.movie_exists(movie_id)
        .await
        .map_err(|_| AppError::NotFound("Movie not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_confirmation_requires_both() {
        assert!(validate_password_confirmation(None, None).is_err());
        assert!(validate_password_confirmation(Some("NewPass123"), None).is_err());
    }

    #[test]
    fn test_password_confirmation_must_match() {
        assert!(validate_password_confirmation(Some("NewPass123"), Some("Different1")).is_err());
        assert!(validate_password_confirmation(Some("NewPass123"), Some("NewPass123")).is_ok());
    }
}
