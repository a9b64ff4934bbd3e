use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{MovieListResponse, UpdateProfileRequest, User, UserEnvelope},
    services::account,
    state::AppState,
};

use super::CurrentUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).patch(patch_me))
        .route("/me/recommendations", post(recommendations))
        .route("/me/favorite/:movie_id", put(add_favorite).delete(remove_favorite))
        .route("/me/watchlist/:movie_id", put(add_watchlist).delete(remove_watchlist))
        .route("/me/rating/:movie_id", put(rate_movie).delete(delete_rating))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

async fn patch_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserEnvelope>> {
    let response = account::update_profile(&state.users, &state.mailer, &user, request).await?;
    Ok(Json(response))
}

/// Profile-aware movie recommendations.
///
/// Always answers 200 with a (possibly empty) list; the engine swallows
/// model and catalog failures by design.
async fn recommendations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<MovieListResponse> {
    let movies = state.recommender.generate_recommendations(&user).await;
    Json(MovieListResponse { movies })
}

async fn add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let favorite_movies =
        account::add_favorite(&state.users, &state.tmdb, &user, movie_id).await?;

    Ok(Json(json!({
        "message": "Movie added to favorites",
        "favorite_movies": favorite_movies,
    })))
}

async fn remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let favorite_movies = account::remove_favorite(&state.users, &user, movie_id).await?;

    Ok(Json(json!({
        "message": "Movie removed from favorites",
        "favorite_movies": favorite_movies,
    })))
}

async fn add_watchlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let watchlist = account::add_to_watchlist(&state.users, &state.tmdb, &user, movie_id).await?;

    Ok(Json(json!({
        "message": "Movie added to watchlist",
        "watchlist": watchlist,
    })))
}

async fn remove_watchlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let watchlist = account::remove_from_watchlist(&state.users, &user, movie_id).await?;

    Ok(Json(json!({
        "message": "Movie removed from watchlist",
        "watchlist": watchlist,
    })))
}

#[derive(Debug, Deserialize)]
struct RatingQuery {
    rating: i32,
}

async fn rate_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<i64>,
    Query(params): Query<RatingQuery>,
) -> AppResult<Json<Value>> {
    let ratings =
        account::rate_movie(&state.users, &state.tmdb, &user, movie_id, params.rating).await?;

    Ok(Json(json!({
        "message": "Movie rated",
        "ratings": ratings,
    })))
}

async fn delete_rating(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let ratings = account::delete_rating(&state.users, &user, movie_id).await?;

    Ok(Json(json!({
        "message": "Rating deleted",
        "ratings": ratings,
    })))
}
