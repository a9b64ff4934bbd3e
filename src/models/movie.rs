use serde::{Deserialize, Serialize};

/// A movie record as returned by TMDB and served to the client.
///
/// TMDB list endpoints return `genre_ids` while detail endpoints return
/// expanded `genres`; both stay optional so one type covers every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genre_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub genres: Option<Vec<Genre>>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub movies: Vec<Movie>,
}

#[derive(Debug, Serialize)]
pub struct GenreListResponse {
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CastResponse {
    pub movie_id: i64,
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieReview {
    pub id: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewsResponse {
    pub movie_id: i64,
    pub reviews: Vec<MovieReview>,
    pub total_results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrailerResponse {
    pub movie_id: i64,
    pub title: Option<String>,
    pub embed_url: Option<String>,
}

// ============================================================================
// TMDB wire types
// ============================================================================

/// Paged list envelope returned by TMDB list endpoints
#[derive(Debug, Deserialize)]
pub struct TmdbPage {
    #[serde(default)]
    pub results: Vec<Movie>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbCastMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

impl From<TmdbCastMember> for CastMember {
    fn from(member: TmdbCastMember) -> Self {
        Self {
            id: member.id,
            name: member.name,
            character: member.character.unwrap_or_default(),
            profile_path: member.profile_path,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TmdbReviewPage {
    #[serde(default)]
    pub results: Vec<MovieReview>,
    #[serde(default)]
    pub total_pages: i64,
    #[serde(default)]
    pub total_results: i64,
}

#[derive(Debug, Deserialize)]
pub struct TmdbVideoList {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbVideo {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(rename = "type", default)]
    pub video_type: Option<String>,
    #[serde(default)]
    pub official: Option<bool>,
    #[serde(default)]
    pub size: Option<i64>,
}

/// Error body TMDB returns on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct TmdbErrorBody {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub status_message: Option<String>,
}
