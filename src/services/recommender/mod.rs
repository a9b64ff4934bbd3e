//! LLM-driven recommendation engine.
//!
//! Turns a user's favorites, watchlist, and rating history into an ordered
//! list of up to twenty movie records: resolve stored ids to titles, build
//! a structured prompt, ask the model for candidate titles, filter out
//! everything the user already knows, then re-resolve the survivors against
//! the catalog.
//!
//! The whole pipeline is fail-soft: a user asking for recommendations never
//! sees an error, only a possibly-empty list.

pub mod parser;
pub mod profile;

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{Movie, User};
use crate::services::tmdb::TmdbClient;

pub use parser::parse_title_array;
pub use profile::{bucket_for, Bucket, PreferenceProfile, RatingBuckets, NEW_USER_PROMPT};

/// Hard cap on candidates and on resolved results
pub const MAX_RECOMMENDATIONS: usize = 20;

pub const SYSTEM_PROMPT: &str = "You are a movie recommendation assistant. \
    Given a user's viewing history, recommend exactly 20 other movies. \
    Respond ONLY with a valid JSON array of movie titles, e.g., \
    [\"Movie 1\", \"Movie 2\", ..., \"Movie 20\"]. \
    No extra text or explanation.";

/// Sampling parameters for the completion call
#[derive(Debug, Clone, Copy)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        // Low temperature: ranking consistency matters more than creativity
        Self {
            temperature: 0.15,
            max_output_tokens: 512,
        }
    }
}

/// Catalog lookups the engine depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Resolves a movie id to its canonical record
    async fn resolve_title(&self, movie_id: i64) -> AppResult<Movie>;

    /// Searches the catalog by title, best match first
    async fn search_by_title(&self, query: &str) -> AppResult<Vec<Movie>>;
}

/// The language model seam; raw text out, parsing is the engine's problem
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        sampling: SamplingConfig,
    ) -> AppResult<String>;
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbClient {
    async fn resolve_title(&self, movie_id: i64) -> AppResult<Movie> {
        self.movie_details(movie_id).await
    }

    async fn search_by_title(&self, query: &str) -> AppResult<Vec<Movie>> {
        self.search_movies(query, 1).await
    }
}

pub struct Recommender {
    metadata: Arc<dyn MetadataProvider>,
    model: Arc<dyn CompletionModel>,
}

impl Recommender {
    pub fn new(metadata: Arc<dyn MetadataProvider>, model: Arc<dyn CompletionModel>) -> Self {
        Self { metadata, model }
    }

    /// Generates up to 20 recommendations for the user.
    ///
    /// Never fails: any error along the way degrades to an empty list.
    pub async fn generate_recommendations(&self, user: &User) -> Vec<Movie> {
        match self.try_generate(user).await {
            Ok(movies) => movies,
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Recommendation generation failed");
                Vec::new()
            }
        }
    }

    async fn try_generate(&self, user: &User) -> AppResult<Vec<Movie>> {
        let profile = self.build_profile(user).await;
        let known = profile.known_titles();

        let prompt = if profile.is_empty_signal() {
            NEW_USER_PROMPT.to_string()
        } else {
            profile.build_prompt()
        };

        let mut titles = self.suggest(&prompt, &known).await?;

        // The profile-aware prompt occasionally yields nothing usable; try
        // the simple favorites-only prompt once before giving up.
        if titles.is_empty() && !profile.favorite_titles.is_empty() {
            titles = self
                .suggest(&profile::legacy_prompt(&profile.favorite_titles), &known)
                .await?;
        }

        if titles.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            user_id = %user.id,
            candidates = titles.len(),
            "Resolving recommended titles"
        );

        Ok(self.resolve_candidates(&titles).await)
    }

    /// Resolves every stored movie id to a title and groups the results.
    ///
    /// Lookups run concurrently; ids that fail to resolve are dropped
    /// without aborting the batch. Results are regrouped by source list, so
    /// lookup completion order never leaks into the profile.
    pub async fn build_profile(&self, user: &User) -> PreferenceProfile {
        let ids: Vec<i64> = user
            .favorite_movies
            .iter()
            .chain(user.watchlist.iter())
            .copied()
            .chain(user.ratings.iter().map(|r| r.movie_id))
            .collect();

        let titles = self.resolve_batch(ids).await;

        let (favorite_slots, rest) = titles.split_at(user.favorite_movies.len());
        let (watchlist_slots, rated_slots) = rest.split_at(user.watchlist.len());

        let collect = |slots: &[Option<String>]| -> Vec<String> {
            slots
                .iter()
                .flatten()
                .filter(|t| !t.is_empty())
                .cloned()
                .collect()
        };

        let mut rating_buckets = RatingBuckets::default();
        for (entry, slot) in user.ratings.iter().zip(rated_slots) {
            if let Some(title) = slot {
                if !title.is_empty() {
                    rating_buckets.push(entry.rating, title.clone());
                }
            }
        }

        PreferenceProfile {
            favorite_titles: collect(favorite_slots),
            watchlist_titles: collect(watchlist_slots),
            rating_buckets,
        }
    }

    /// Fan-out id resolution; one slot per input id, `None` on failure
    async fn resolve_batch(&self, ids: Vec<i64>) -> Vec<Option<String>> {
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            let metadata = Arc::clone(&self.metadata);
            tasks.push(tokio::spawn(async move {
                metadata.resolve_title(id).await.ok().map(|movie| movie.title)
            }));
        }

        let mut slots = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(slot) => slots.push(slot),
                Err(e) => {
                    tracing::error!(error = %e, "Title resolution task failed");
                    slots.push(None);
                }
            }
        }

        slots
    }

    async fn suggest(&self, prompt: &str, known: &HashSet<String>) -> AppResult<Vec<String>> {
        let raw = self
            .model
            .complete(SYSTEM_PROMPT, prompt, SamplingConfig::default())
            .await?;

        Ok(dedup_titles(parse_title_array(&raw), known))
    }

    /// Re-resolves candidate titles to catalog records, in order.
    ///
    /// Titles that error or match nothing are skipped; resolution stops as
    /// soon as 20 records are collected.
    async fn resolve_candidates(&self, titles: &[String]) -> Vec<Movie> {
        let mut movies = Vec::new();

        for title in titles {
            if movies.len() >= MAX_RECOMMENDATIONS {
                break;
            }

            match self.metadata.search_by_title(title).await {
                Ok(results) => match results.into_iter().next() {
                    Some(movie) => movies.push(movie),
                    None => {
                        tracing::debug!(title = %title, "No catalog match for recommended title");
                    }
                },
                Err(e) => {
                    tracing::warn!(title = %title, error = %e, "Search failed for recommended title");
                    continue;
                }
            }
        }

        movies
    }
}

/// Drops known and repeated titles (case-insensitive) and caps the list
fn dedup_titles(raw: Vec<String>, known: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();

    for title in raw {
        let key = title.to_lowercase();
        if title.trim().is_empty() || known.contains(&key) || !seen.insert(key) {
            continue;
        }

        accepted.push(title);
        if accepted.len() == MAX_RECOMMENDATIONS {
            break;
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatingEntry;
    use chrono::Utc;

    fn movie(id: i64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            overview: None,
            popularity: None,
            poster_path: None,
            vote_average: None,
            vote_count: None,
            genre_ids: None,
            genres: None,
            release_date: None,
        }
    }

    fn user_with(
        favorites: Vec<i64>,
        watchlist: Vec<i64>,
        ratings: Vec<RatingEntry>,
    ) -> User {
        User {
            id: "user-1".to_string(),
            username: "movie_fan".to_string(),
            email: "fan@example.com".to_string(),
            first_name: None,
            last_name: None,
            phone_number: None,
            google_id: None,
            auth_provider: "local".to_string(),
            hashed_password: None,
            is_verified: true,
            created_at: Utc::now(),
            favorite_movies: favorites,
            watchlist,
            ratings,
        }
    }

    fn titles_json(titles: &[&str]) -> String {
        serde_json::to_string(titles).unwrap()
    }

    /// Metadata mock that resolves id n to "Movie n" and matches every search
    fn echo_metadata() -> MockMetadataProvider {
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_resolve_title()
            .returning(|id| Ok(movie(id, &format!("Movie {}", id))));
        metadata
            .expect_search_by_title()
            .returning(|query| Ok(vec![movie(1000, query)]));
        metadata
    }

    #[test]
    fn test_dedup_removes_known_titles_case_insensitively() {
        let known: HashSet<String> = ["inception".to_string()].into_iter().collect();
        let raw = vec![
            "INCEPTION".to_string(),
            "Heat".to_string(),
            "heat".to_string(),
            "Dune".to_string(),
        ];

        assert_eq!(dedup_titles(raw, &known), vec!["Heat", "Dune"]);
    }

    #[test]
    fn test_dedup_caps_at_twenty() {
        let raw: Vec<String> = (0..30).map(|i| format!("Movie {}", i)).collect();
        let deduped = dedup_titles(raw, &HashSet::new());
        assert_eq!(deduped.len(), MAX_RECOMMENDATIONS);
        assert_eq!(deduped[0], "Movie 0");
        assert_eq!(deduped[19], "Movie 19");
    }

    #[test]
    fn test_dedup_skips_blank_titles() {
        let raw = vec!["  ".to_string(), "".to_string(), "Heat".to_string()];
        assert_eq!(dedup_titles(raw, &HashSet::new()), vec!["Heat"]);
    }

    #[tokio::test]
    async fn test_profile_groups_ratings_into_buckets() {
        let metadata = echo_metadata();
        let model = MockCompletionModel::new();
        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));

        let user = user_with(
            vec![1],
            vec![2],
            vec![
                RatingEntry {
                    movie_id: 3,
                    rating: 9,
                },
                RatingEntry {
                    movie_id: 4,
                    rating: 6,
                },
                RatingEntry {
                    movie_id: 5,
                    rating: 2,
                },
            ],
        );

        let profile = recommender.build_profile(&user).await;
        assert_eq!(profile.favorite_titles, vec!["Movie 1"]);
        assert_eq!(profile.watchlist_titles, vec!["Movie 2"]);
        assert_eq!(profile.rating_buckets.high, vec!["Movie 3"]);
        assert_eq!(profile.rating_buckets.medium, vec!["Movie 4"]);
        assert_eq!(profile.rating_buckets.low, vec!["Movie 5"]);
    }

    #[tokio::test]
    async fn test_profile_drops_unresolvable_ids() {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_resolve_title().returning(|id| {
            if id == 2 {
                Err(crate::error::AppError::NotFound("gone".to_string()))
            } else {
                Ok(movie(id, &format!("Movie {}", id)))
            }
        });

        let recommender =
            Recommender::new(Arc::new(metadata), Arc::new(MockCompletionModel::new()));
        let user = user_with(vec![1, 2, 3], vec![], vec![]);

        let profile = recommender.build_profile(&user).await;
        assert_eq!(profile.favorite_titles, vec!["Movie 1", "Movie 3"]);
    }

    #[tokio::test]
    async fn test_favorites_only_prompt_has_no_rating_sections() {
        // Scenario: one favorite, nothing else; the model echoes the
        // favorite back, which must not reappear in the output.
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_resolve_title()
            .returning(|id| Ok(movie(id, "Inception")));
        metadata
            .expect_search_by_title()
            .returning(|query| Ok(vec![movie(2000, query)]));

        let mut model = MockCompletionModel::new();
        model
            .expect_complete()
            .withf(|_, prompt, _| {
                prompt.contains("FAVORITE MOVIES: Inception")
                    && !prompt.contains("HIGHLY RATED")
                    && !prompt.contains("ON WATCHLIST")
            })
            .returning(|_, _, _| Ok(titles_json(&["Interstellar", "Inception", "Heat"])));

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(vec![27205], vec![], vec![]);

        let movies = recommender.generate_recommendations(&user).await;
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Interstellar", "Heat"]);
    }

    #[tokio::test]
    async fn test_highly_rated_title_is_excluded_from_output() {
        // Scenario: a 9-rated movie lands in the high bucket and the
        // exclusion set, never in the result.
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_resolve_title()
            .returning(|id| Ok(movie(id, "X")));
        metadata
            .expect_search_by_title()
            .returning(|query| Ok(vec![movie(2000, query)]));

        let mut model = MockCompletionModel::new();
        model
            .expect_complete()
            .withf(|_, prompt, _| {
                prompt.contains("HIGHLY RATED (8-10): X") && prompt.contains("DO NOT RECOMMEND: X")
            })
            .returning(|_, _, _| Ok(titles_json(&["X", "Y"])));

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(
            vec![],
            vec![],
            vec![RatingEntry {
                movie_id: 7,
                rating: 9,
            }],
        );

        let movies = recommender.generate_recommendations(&user).await;
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Y"]);
    }

    #[tokio::test]
    async fn test_model_overrun_truncated_to_twenty() {
        // Scenario: the model returns 25 titles; only 20 go to resolution.
        let metadata = echo_metadata();

        let overrun: Vec<String> = (0..25).map(|i| format!("Pick {}", i)).collect();
        let overrun_json = serde_json::to_string(&overrun).unwrap();

        let mut model = MockCompletionModel::new();
        model
            .expect_complete()
            .returning(move |_, _, _| Ok(overrun_json.clone()));

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(vec![1], vec![], vec![]);

        let movies = recommender.generate_recommendations(&user).await;
        assert_eq!(movies.len(), MAX_RECOMMENDATIONS);
        assert_eq!(movies[0].title, "Pick 0");
        assert_eq!(movies[19].title, "Pick 19");
    }

    #[tokio::test]
    async fn test_new_user_gets_fallback_prompt() {
        // Scenario: nothing to personalize on; the fixed new-user prompt is
        // sent instead of the composed sections.
        let metadata = echo_metadata();

        let mut model = MockCompletionModel::new();
        model
            .expect_complete()
            .withf(|system, prompt, _| {
                system == SYSTEM_PROMPT && prompt == NEW_USER_PROMPT
            })
            .returning(|_, _, _| Ok(titles_json(&["Casablanca"])));

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(vec![], vec![], vec![]);

        let movies = recommender.generate_recommendations(&user).await;
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Casablanca");
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_empty() {
        let metadata = echo_metadata();

        let mut model = MockCompletionModel::new();
        model.expect_complete().returning(|_, _, _| {
            Err(crate::error::AppError::ExternalApi(
                "connection refused".to_string(),
            ))
        });

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(vec![1], vec![], vec![]);

        let movies = recommender.generate_recommendations(&user).await;
        assert!(movies.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_model_output_degrades_to_empty() {
        let metadata = echo_metadata();

        let mut model = MockCompletionModel::new();
        model
            .expect_complete()
            .returning(|_, _, _| Ok("no json to be found".to_string()));

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(vec![], vec![], vec![]);

        let movies = recommender.generate_recommendations(&user).await;
        assert!(movies.is_empty());
    }

    #[tokio::test]
    async fn test_resolver_skips_unmatched_titles() {
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_resolve_title()
            .returning(|id| Ok(movie(id, &format!("Movie {}", id))));
        metadata.expect_search_by_title().returning(|query| {
            if query == "Ghost Film" {
                Ok(vec![])
            } else {
                Ok(vec![movie(2000, query)])
            }
        });

        let mut model = MockCompletionModel::new();
        model
            .expect_complete()
            .returning(|_, _, _| Ok(titles_json(&["Real Film", "Ghost Film", "Other Film"])));

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(vec![1], vec![], vec![]);

        let movies = recommender.generate_recommendations(&user).await;
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Real Film", "Other Film"]);
    }

    #[tokio::test]
    async fn test_resolver_survives_per_title_errors() {
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_resolve_title()
            .returning(|id| Ok(movie(id, &format!("Movie {}", id))));
        metadata.expect_search_by_title().returning(|query| {
            if query == "Cursed Film" {
                Err(crate::error::AppError::ExternalApi("boom".to_string()))
            } else {
                Ok(vec![movie(2000, query)])
            }
        });

        let mut model = MockCompletionModel::new();
        model
            .expect_complete()
            .returning(|_, _, _| Ok(titles_json(&["Cursed Film", "Fine Film"])));

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(vec![1], vec![], vec![]);

        let movies = recommender.generate_recommendations(&user).await;
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Fine Film"]);
    }

    #[tokio::test]
    async fn test_legacy_fallback_after_empty_enhanced_result() {
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_resolve_title()
            .returning(|id| Ok(movie(id, "Inception")));
        metadata
            .expect_search_by_title()
            .returning(|query| Ok(vec![movie(2000, query)]));

        let mut model = MockCompletionModel::new();
        // First call: profile-aware prompt, junk response
        model
            .expect_complete()
            .withf(|_, prompt, _| prompt.contains("FAVORITE MOVIES:"))
            .times(1)
            .returning(|_, _, _| Ok("nothing useful".to_string()));
        // Second call: favorites-only prompt succeeds
        model
            .expect_complete()
            .withf(|_, prompt, _| prompt.starts_with("Based on these movies: Inception"))
            .times(1)
            .returning(|_, _, _| Ok(titles_json(&["Heat"])));

        let recommender = Recommender::new(Arc::new(metadata), Arc::new(model));
        let user = user_with(vec![27205], vec![], vec![]);

        let movies = recommender.generate_recommendations(&user).await;
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Heat"]);
    }
}
