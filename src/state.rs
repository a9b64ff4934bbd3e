use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    db::{Cache, UserStore},
    error::AppResult,
    services::{LlmClient, Mailer, Recommender, TmdbClient},
};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: UserStore,
    pub tmdb: Arc<TmdbClient>,
    pub mailer: Mailer,
    pub recommender: Arc<Recommender>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool, cache: Cache) -> AppResult<Self> {
        let users = UserStore::new(pool);
        let tmdb = Arc::new(TmdbClient::new(
            cache,
            config.tmdb_api_key.clone(),
            config.tmdb_base_url.clone(),
        ));
        let llm = Arc::new(LlmClient::new(
            config.llm_endpoint.clone(),
            config.model_id.clone(),
        ));
        let recommender = Arc::new(Recommender::new(tmdb.clone(), llm));
        let mailer = Mailer::new(&config)?;

        Ok(Self {
            config,
            users,
            tmdb,
            mailer,
            recommender,
        })
    }
}
