/// TMDB metadata client
///
/// Thin proxy over the TMDB v3 API with read-through Redis caching.
/// Every other service resolves movie ids and free-text queries to
/// canonical records through this client.
///
/// TMDB reports failures with its own proprietary status codes inside the
/// response body; those are mapped back to sensible HTTP statuses before
/// they reach a handler.
use axum::http::StatusCode;
use reqwest::Client as HttpClient;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        CastMember, CastResponse, Genre, Movie, MovieReview, ReviewsResponse, TmdbCredits,
        TmdbErrorBody, TmdbGenreList, TmdbPage, TmdbReviewPage, TmdbVideoList, TrailerResponse,
    },
};

const LIST_CACHE_TTL: u64 = 1800; // 30 minutes
const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
const GENRES_CACHE_TTL: u64 = 604800; // 1 week

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    cache: Cache,
}

impl TmdbClient {
    pub fn new(cache: Cache, api_key: String, base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            base_url,
            cache,
        }
    }

    pub async fn popular_movies(&self, page: u32) -> AppResult<Vec<Movie>> {
        cached!(
            self.cache,
            CacheKey::PopularMovies(page),
            LIST_CACHE_TTL,
            async move {
                let page_param = page.to_string();
                let page_data: TmdbPage = self
                    .get_json(
                        &format!("{}/movie/popular", self.base_url),
                        &[("language", "en-US"), ("page", page_param.as_str())],
                    )
                    .await?;

                tracing::info!(
                    page = page,
                    results = page_data.results.len(),
                    "Fetched popular movies"
                );

                Ok(page_data.results)
            }
        )
    }

    pub async fn search_movies(&self, query: &str, page: u32) -> AppResult<Vec<Movie>> {
        if query.trim().is_empty() {
            return Err(AppError::validation("query", "Search query cannot be empty"));
        }

        cached!(
            self.cache,
            CacheKey::MovieSearch {
                query: query.to_string(),
                page,
            },
            SEARCH_CACHE_TTL,
            async move {
                let page_param = page.to_string();
                let page_data: TmdbPage = self
                    .get_json(
                        &format!("{}/search/movie", self.base_url),
                        &[
                            ("query", query),
                            ("language", "en-US"),
                            ("page", page_param.as_str()),
                        ],
                    )
                    .await?;

                tracing::info!(
                    query = %query,
                    results = page_data.results.len(),
                    "Movie search completed"
                );

                Ok(page_data.results)
            }
        )
    }

    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        cached!(self.cache, CacheKey::Genres, GENRES_CACHE_TTL, async move {
            let list: TmdbGenreList = self
                .get_json(
                    &format!("{}/genre/movie/list", self.base_url),
                    &[("language", "en-US")],
                )
                .await?;

            Ok(list.genres)
        })
    }

    pub async fn movies_by_genre(&self, genre_id: i64, page: u32) -> AppResult<Vec<Movie>> {
        cached!(
            self.cache,
            CacheKey::MoviesByGenre { genre_id, page },
            LIST_CACHE_TTL,
            async move {
                let genre_param = genre_id.to_string();
                let page_param = page.to_string();
                let page_data: TmdbPage = self
                    .get_json(
                        &format!("{}/discover/movie", self.base_url),
                        &[
                            ("with_genres", genre_param.as_str()),
                            ("page", page_param.as_str()),
                        ],
                    )
                    .await?;

                Ok(page_data.results)
            }
        )
    }

    pub async fn movie_details(&self, movie_id: i64) -> AppResult<Movie> {
        cached!(
            self.cache,
            CacheKey::MovieDetails(movie_id),
            DETAILS_CACHE_TTL,
            async move {
                let movie: Movie = self
                    .get_json(
                        &format!("{}/movie/{}", self.base_url, movie_id),
                        &[("language", "en-US")],
                    )
                    .await?;

                Ok(movie)
            }
        )
    }

    pub async fn movie_cast(&self, movie_id: i64) -> AppResult<CastResponse> {
        let cast: Vec<CastMember> = cached!(
            self.cache,
            CacheKey::MovieCast(movie_id),
            DETAILS_CACHE_TTL,
            async move {
                let no_params: &[(&str, &str)] = &[];
                let credits: TmdbCredits = self
                    .get_json(
                        &format!("{}/movie/{}/credits", self.base_url, movie_id),
                        no_params,
                    )
                    .await?;

                let cast: Vec<CastMember> =
                    credits.cast.into_iter().map(CastMember::from).collect();

                Ok(cast)
            }
        )?;

        Ok(CastResponse { movie_id, cast })
    }

    /// Fetches every review page for a movie
    ///
    /// The first page reports `total_pages`; the remaining pages are fetched
    /// concurrently and stitched back in page order.
    pub async fn movie_reviews(&self, movie_id: i64) -> AppResult<ReviewsResponse> {
        cached!(
            self.cache,
            CacheKey::MovieReviews(movie_id),
            SEARCH_CACHE_TTL,
            async move {
                let url = format!("{}/movie/{}/reviews", self.base_url, movie_id);

                let first_page: TmdbReviewPage = self
                    .get_json(&url, &[("language", "en-US"), ("page", "1")])
                    .await?;

                let total_pages = first_page.total_pages;
                let total_results = first_page.total_results;

                let mut tasks = Vec::new();
                for page in 2..=total_pages {
                    let client = self.clone();
                    let url = url.clone();
                    tasks.push(tokio::spawn(async move {
                        let page_param = page.to_string();
                        client
                            .get_json::<TmdbReviewPage>(
                                &url,
                                &[("language", "en-US"), ("page", page_param.as_str())],
                            )
                            .await
                    }));
                }

                let mut reviews: Vec<MovieReview> = first_page.results;
                for task in tasks {
                    match task.await {
                        Ok(Ok(page_data)) => reviews.extend(page_data.results),
                        Ok(Err(e)) => {
                            tracing::warn!(movie_id = movie_id, error = %e, "Review page fetch failed");
                        }
                        Err(e) => {
                            tracing::warn!(movie_id = movie_id, error = %e, "Review page task failed");
                        }
                    }
                }

                Ok(ReviewsResponse {
                    movie_id,
                    reviews,
                    total_results,
                })
            }
        )
    }

    /// Picks the best YouTube trailer: official uploads first, larger
    /// resolutions first within each group.
    pub async fn movie_trailer(&self, movie_id: i64) -> AppResult<TrailerResponse> {
        cached!(
            self.cache,
            CacheKey::MovieTrailer(movie_id),
            DETAILS_CACHE_TTL,
            async move {
                let videos: TmdbVideoList = self
                    .get_json(
                        &format!("{}/movie/{}/videos", self.base_url, movie_id),
                        &[("language", "en-US")],
                    )
                    .await?;

                let mut trailers: Vec<_> = videos
                    .results
                    .into_iter()
                    .filter(|v| {
                        v.site.as_deref() == Some("YouTube")
                            && v.video_type.as_deref() == Some("Trailer")
                    })
                    .collect();

                trailers.sort_by_key(|v| (!v.official.unwrap_or(false), -v.size.unwrap_or(0)));

                let trailer = trailers.into_iter().next();

                Ok(TrailerResponse {
                    movie_id,
                    title: trailer.as_ref().and_then(|t| t.name.clone()),
                    embed_url: trailer
                        .map(|t| format!("https://www.youtube.com/embed/{}", t.key)),
                })
            }
        )
    }

    /// Cheap existence probe used before list writes
    pub async fn movie_exists(&self, movie_id: i64) -> AppResult<()> {
        let url = format!("{}/movie/{}", self.base_url, movie_id);
        let response = self
            .http_client
            .head(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::NotFound("Movie not found".to_string()));
        }

        Ok(())
    }

    /// Issues a GET with the API key attached and decodes the JSON body,
    /// translating TMDB error bodies on the way out.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let response = self
            .http_client
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: TmdbErrorBody = response.json().await.unwrap_or(TmdbErrorBody {
                status_code: None,
                status_message: None,
            });

            let tmdb_code = body.status_code.unwrap_or(status.as_u16());
            let message = body
                .status_message
                .unwrap_or_else(|| "Unknown error".to_string());

            tracing::error!(
                url = %url,
                status = %status,
                tmdb_code = tmdb_code,
                "TMDB request failed"
            );

            return Err(AppError::Upstream {
                status: map_tmdb_status(tmdb_code, status),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Maps TMDB's proprietary status codes onto HTTP statuses.
///
/// Falls back to the transport status when the code is unknown.
pub fn map_tmdb_status(tmdb_code: u16, http_status: StatusCode) -> StatusCode {
    match tmdb_code {
        3 | 7 | 14 => StatusCode::UNAUTHORIZED,
        6 | 34 => StatusCode::NOT_FOUND,
        10 | 16 | 17 | 28 => StatusCode::FORBIDDEN,
        11 => StatusCode::INTERNAL_SERVER_ERROR,
        22 | 24 | 25 | 26 => StatusCode::BAD_REQUEST,
        _ => http_status,
    }
}
