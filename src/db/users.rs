use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{RatingEntry, User},
};

/// PostgreSQL-backed user store.
///
/// Favorites and watchlist live as array columns with set semantics enforced
/// by guarded updates; ratings live in their own table keyed on
/// (user_id, movie_id) so writes are natural upserts.
#[derive(Clone)]
pub struct UserStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone_number: Option<String>,
    google_id: Option<String>,
    auth_provider: String,
    hashed_password: Option<String>,
    is_verified: bool,
    created_at: DateTime<Utc>,
    favorite_movies: Vec<i64>,
    watchlist: Vec<i64>,
}

impl UserRow {
    fn into_user(self, ratings: Vec<RatingEntry>) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            google_id: self.google_id,
            auth_provider: self.auth_provider,
            hashed_password: self.hashed_password,
            is_verified: self.is_verified,
            created_at: self.created_at,
            favorite_movies: self.favorite_movies,
            watchlist: self.watchlist,
            ratings,
        }
    }
}

const SELECT_USER: &str = "SELECT id, username, email, first_name, last_name, phone_number, \
     google_id, auth_provider, hashed_password, is_verified, created_at, \
     favorite_movies, watchlist FROM users";

/// Profile fields applied in a single update; `None` leaves the column untouched
#[derive(Debug, Default)]
pub struct ProfileUpdates {
    pub username: Option<String>,
    pub hashed_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl ProfileUpdates {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.hashed_password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
    }
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: &str) -> AppResult<Option<User>> {
        self.find_by_column("id", user_id).await
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.find_by_column("username", username).await
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.find_by_column("email", email).await
    }

    async fn find_by_column(&self, column: &str, value: &str) -> AppResult<Option<User>> {
        // `column` is always one of our own identifiers, never user input
        let query = format!("{} WHERE {} = $1", SELECT_USER, column);
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let ratings = self.ratings_for(&row.id).await?;
                Ok(Some(row.into_user(ratings)))
            }
            None => Ok(None),
        }
    }

    pub async fn insert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, first_name, last_name, phone_number, \
             google_id, auth_provider, hashed_password, is_verified, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(&user.google_id)
        .bind(&user.auth_provider)
        .bind(&user.hashed_password)
        .bind(user.is_verified)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies the given profile fields and returns the updated user
    pub async fn apply_profile_updates(
        &self,
        user_id: &str,
        updates: ProfileUpdates,
    ) -> AppResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "UPDATE users SET \
                 username = COALESCE($2, username), \
                 hashed_password = COALESCE($3, hashed_password), \
                 first_name = COALESCE($4, first_name), \
                 last_name = COALESCE($5, last_name), \
                 phone_number = COALESCE($6, phone_number) \
             WHERE id = $1 \
             RETURNING id, username, email, first_name, last_name, phone_number, \
                 google_id, auth_provider, hashed_password, is_verified, created_at, \
                 favorite_movies, watchlist",
        )
        .bind(user_id)
        .bind(updates.username)
        .bind(updates.hashed_password)
        .bind(updates.first_name)
        .bind(updates.last_name)
        .bind(updates.phone_number)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let ratings = self.ratings_for(&row.id).await?;
        Ok(row.into_user(ratings))
    }

    /// Marks the user verified and applies the email the token carried
    pub async fn set_verified_email(&self, user_id: &str, email: &str) -> AppResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "UPDATE users SET email = $2, is_verified = TRUE WHERE id = $1 \
             RETURNING id, username, email, first_name, last_name, phone_number, \
                 google_id, auth_provider, hashed_password, is_verified, created_at, \
                 favorite_movies, watchlist",
        )
        .bind(user_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| AppError::validation("email", "User not found"))?;
        let ratings = self.ratings_for(&row.id).await?;
        Ok(row.into_user(ratings))
    }

    /// Links a Google identity to an existing local account
    pub async fn link_google_identity(
        &self,
        user_id: &str,
        google_id: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "UPDATE users SET google_id = $2, first_name = COALESCE($3, first_name), \
                 last_name = COALESCE($4, last_name), auth_provider = 'both', \
                 is_verified = TRUE \
             WHERE id = $1 \
             RETURNING id, username, email, first_name, last_name, phone_number, \
                 google_id, auth_provider, hashed_password, is_verified, created_at, \
                 favorite_movies, watchlist",
        )
        .bind(user_id)
        .bind(google_id)
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let ratings = self.ratings_for(&row.id).await?;
        Ok(row.into_user(ratings))
    }

    // ------------------------------------------------------------------
    // Favorites & watchlist
    // ------------------------------------------------------------------

    pub async fn add_favorite(&self, user_id: &str, movie_id: i64) -> AppResult<Vec<i64>> {
        self.add_to_list(user_id, "favorite_movies", movie_id).await
    }

    pub async fn remove_favorite(&self, user_id: &str, movie_id: i64) -> AppResult<Vec<i64>> {
        self.remove_from_list(user_id, "favorite_movies", movie_id)
            .await
    }

    pub async fn add_to_watchlist(&self, user_id: &str, movie_id: i64) -> AppResult<Vec<i64>> {
        self.add_to_list(user_id, "watchlist", movie_id).await
    }

    pub async fn remove_from_watchlist(&self, user_id: &str, movie_id: i64) -> AppResult<Vec<i64>> {
        self.remove_from_list(user_id, "watchlist", movie_id).await
    }

    /// Appends to an array column only when absent, returning the new list
    async fn add_to_list(&self, user_id: &str, column: &str, movie_id: i64) -> AppResult<Vec<i64>> {
        let query = format!(
            "UPDATE users SET {column} = array_append({column}, $2) \
             WHERE id = $1 AND NOT ($2 = ANY({column})) RETURNING {column}",
        );
        let updated: Option<(Vec<i64>,)> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some((list,)) => Ok(list),
            // Either the user vanished or the id was already present; callers
            // check membership first so report the duplicate case.
            None => Err(AppError::validation(
                "movie_id",
                "Movie already in the list",
            )),
        }
    }

    async fn remove_from_list(
        &self,
        user_id: &str,
        column: &str,
        movie_id: i64,
    ) -> AppResult<Vec<i64>> {
        let query = format!(
            "UPDATE users SET {column} = array_remove({column}, $2) \
             WHERE id = $1 RETURNING {column}",
        );
        let updated: Option<(Vec<i64>,)> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .await?;

        updated
            .map(|(list,)| list)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    pub async fn ratings_for(&self, user_id: &str) -> AppResult<Vec<RatingEntry>> {
        let rows: Vec<(i64, i32)> = sqlx::query_as(
            "SELECT movie_id, rating FROM user_ratings WHERE user_id = $1 ORDER BY movie_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(movie_id, rating)| RatingEntry { movie_id, rating })
            .collect())
    }

    pub async fn upsert_rating(
        &self,
        user_id: &str,
        movie_id: i64,
        rating: i32,
    ) -> AppResult<Vec<RatingEntry>> {
        sqlx::query(
            "INSERT INTO user_ratings (user_id, movie_id, rating) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, movie_id) DO UPDATE SET rating = EXCLUDED.rating",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(rating)
        .execute(&self.pool)
        .await?;

        self.ratings_for(user_id).await
    }

    pub async fn delete_rating(&self, user_id: &str, movie_id: i64) -> AppResult<Vec<RatingEntry>> {
        let result = sqlx::query("DELETE FROM user_ratings WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Rating not found for this movie".to_string(),
            ));
        }

        self.ratings_for(user_id).await
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Deletes unverified accounts created before the cutoff, returning the count
    pub async fn delete_unverified_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM users WHERE is_verified = FALSE AND created_at < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
