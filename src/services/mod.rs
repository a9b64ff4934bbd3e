pub mod account;
pub mod auth;
pub mod email;
pub mod llm;
pub mod maintenance;
pub mod recommender;
pub mod security;
pub mod tmdb;

pub use email::Mailer;
pub use llm::LlmClient;
pub use recommender::Recommender;
pub use tmdb::TmdbClient;
