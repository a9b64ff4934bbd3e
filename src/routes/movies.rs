use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{
        CastResponse, GenreListResponse, Movie, MovieListResponse, ReviewsResponse,
        TrailerResponse,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/popular", get(popular))
        .route("/search", get(search))
        .route("/genres", get(genres))
        .route("/genre/:genre_id", get(by_genre))
        .route("/:movie_id/cast", get(cast))
        .route("/:movie_id/reviews", get(reviews))
        .route("/:movie_id/trailer", get(trailer))
        .route("/:movie_id", get(details))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: u32,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: String,
    #[serde(default = "default_page")]
    page: u32,
}

fn default_page() -> u32 {
    1
}

fn validate_page(page: u32) -> AppResult<u32> {
    if page == 0 {
        return Err(AppError::validation("page", "Page must be at least 1"));
    }
    Ok(page)
}

async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<MovieListResponse>> {
    let page = validate_page(params.page)?;
    let movies = state.tmdb.popular_movies(page).await?;
    Ok(Json(MovieListResponse { movies }))
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<MovieListResponse>> {
    let page = validate_page(params.page)?;
    let movies = state.tmdb.search_movies(&params.query, page).await?;
    Ok(Json(MovieListResponse { movies }))
}

async fn genres(State(state): State<AppState>) -> AppResult<Json<GenreListResponse>> {
    let genres = state.tmdb.genres().await?;
    Ok(Json(GenreListResponse { genres }))
}

async fn by_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<MovieListResponse>> {
    let page = validate_page(params.page)?;
    let movies = state.tmdb.movies_by_genre(genre_id, page).await?;
    Ok(Json(MovieListResponse { movies }))
}

async fn cast(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<CastResponse>> {
    let cast = state.tmdb.movie_cast(movie_id).await?;
    Ok(Json(cast))
}

async fn reviews(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<ReviewsResponse>> {
    let reviews = state.tmdb.movie_reviews(movie_id).await?;
    Ok(Json(reviews))
}

async fn trailer(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<TrailerResponse>> {
    let trailer = state.tmdb.movie_trailer(movie_id).await?;
    Ok(Json(trailer))
}

async fn details(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Movie>> {
    let movie = state.tmdb.movie_details(movie_id).await?;
    Ok(Json(movie))
}
